//! Tiny macro for deriving arithmetic operator impls on transparent integer newtypes.

#[macro_export]
macro_rules! op {
    (binary $t:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self::from(std::ops::$trait::$method(self.value(), rhs.value()))
            }
        }
    };
    (inplace $t:ty, $trait:ident, $method:ident, $op:tt) => {
        impl std::ops::$trait for $t {
            fn $method(&mut self, rhs: Self) {
                *self = Self::from(self.value() $op rhs.value());
            }
        }
    };
    (unary $t:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self::from(std::ops::$trait::$method(self.value()))
            }
        }
    };
}
