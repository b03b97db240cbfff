//! Macros for ergonomic state identity declaration.

/// Declare a state identity enum and implement [`State`](crate::core::State)
/// for it.
///
/// Variants are named after themselves; the optional `final:` list names the
/// states in which a root region counts as finished.
///
/// # Example
///
/// ```
/// use orthostate::core::State;
/// use orthostate::state_enum;
///
/// state_enum! {
///     pub enum Dance {
///         Forward,
///         Rotate,
///         Backward,
///         Done,
///     }
///     final: [Done]
/// }
///
/// assert_eq!(Dance::Rotate.name(), "Rotate");
/// assert!(Dance::Done.is_final());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
