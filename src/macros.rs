/// Returns early with an error of the given kind and a formatted description.
macro_rules! fail {
    ($kind:ident, $($arg:tt)+) => {
        return Err($crate::error::Error::$kind(format!($($arg)+)))
    };
}

/// Returns early with an error of the given kind if the condition does not hold.
macro_rules! ensure {
    ($expr:expr, $kind:ident, $($arg:tt)+) => {
        if !($expr) {
            fail!($kind, $($arg)+);
        }
    };
}

#[cfg(test)]
macro_rules! assert_err {
    ($expr:expr, $kind:ident, $err:expr) => {
        match $expr {
            Ok(_) => {
                panic!("assertion failed: not an error in `{}`", stringify!($expr));
            }
            Err(ref value) => {
                assert_eq!(value.kind(), $crate::error::ErrorKind::$kind, "{}", value);
                let desc = value.to_string();
                if !desc.contains($err) {
                    panic!(
                        "assertion failed: error message `{}` doesn't contain `{}` in `{}`",
                        desc,
                        $err,
                        stringify!($expr)
                    );
                }
            }
        }
    };
}
