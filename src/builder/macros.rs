//! Macros for declaring state enums.

/// Declare a fieldless state enum and implement [`State`](crate::core::State)
/// for it.
///
/// The enum derives `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Debug` and
/// serde's `Serialize`/`Deserialize`, and gets a `VARIANTS` constant listing
/// every variant in declaration order.
///
/// # Example
///
/// ```
/// use lifeline::core::State;
/// use lifeline::state_enum;
///
/// state_enum! {
///     pub enum Combat {
///         Idle,
///         Attacking,
///         Dead,
///     }
///     final: [Dead]
/// }
///
/// assert_eq!(Combat::Attacking.name(), "Attacking");
/// assert!(Combat::Dead.is_final());
/// assert_eq!(Combat::VARIANTS.len(), 3);
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

        impl $name {
            #[allow(dead_code)]
            $vis const VARIANTS: &'static [$name] = &[$($name::$variant),*];
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
