/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Object keys must be literals. Anything that is not `null`, `true`, `false`,
/// an array or an object goes through [`to_value`](crate::to_value), so
/// variables and expressions in parentheses work too.
///
/// ```rust
/// use serde_cbon::{cbon, to_string};
///
/// let port = 8080;
/// let value = cbon!({ "host": "localhost", "port": port, "tags": ["a", null] });
/// assert_eq!(to_string(&value).unwrap(), "{host localhost,port 8080,tags[a,null]}");
/// ```
#[macro_export]
macro_rules! cbon {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::cbon!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::CbonMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::CbonMap::new();
        $(
            object.insert($key.to_string(), $crate::cbon!($value));
        )*
        $crate::Value::Object(object)
    }};

    ($other:expr) => {
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    };
}
