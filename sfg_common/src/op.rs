//! Generates `std::ops` impls for single-field numeric newtypes.

/// Forwards an operator trait to the wrapped value, so newtypes like `Credits` get arithmetic
/// without hand-written boilerplate. Three forms: `Type: Trait::method` for value-returning
/// binary ops, `Type: mut Trait::method` for the assigning variants, and `Type: neg`.
#[macro_export]
macro_rules! op {
    ($newtype:ident: $op_trait:ident::$method:ident) => {
        impl std::ops::$op_trait for $newtype {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self(std::ops::$op_trait::$method(self.0, rhs.0))
            }
        }
    };

    ($newtype:ident: mut $op_trait:ident::$method:ident) => {
        impl std::ops::$op_trait for $newtype {
            fn $method(&mut self, rhs: Self) {
                std::ops::$op_trait::$method(&mut self.0, rhs.0)
            }
        }
    };

    ($newtype:ident: neg) => {
        impl std::ops::Neg for $newtype {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }
    };
}
