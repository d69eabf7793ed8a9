//! Shorthands for building and returning [`crate::error::AlertsError`]s.

/// Creates an [`crate::error::AlertsError`] from a kind, a static description and
/// optionally a dynamic detail and a source error.
#[macro_export]
macro_rules! alerts_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::AlertsError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::AlertsError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::AlertsError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::AlertsError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with an [`crate::error::AlertsError`]; accepts the same arguments as
/// [`alerts_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::alerts_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::alerts_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::alerts_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::alerts_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
