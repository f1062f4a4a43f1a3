//! Builder helpers shared by the configuration structs.

macro_rules! gen_setter {
    ($(#[$comments:meta])* $field:ident : into $t:ty) => {
        $(#[$comments])*
        #[inline]
        pub fn $field<T: Into<$t>>(mut self, value: T) -> Self {
            self.$field = value.into();
            self
        }
    };
    ($(#[$comments:meta])* $field:ident : val $t:ty) => {
        $(#[$comments])*
        #[inline]
        pub fn $field(mut self, value: $t) -> Self {
            self.$field = value;
            self
        }
    };
}

macro_rules! gen_setters {
    ($target:ident, $($(#[$comments:meta])* $field:ident : $k:tt $tp:ty),+) => (
        impl $target {$(
            gen_setter! { $(#[$comments])* $field : $k $tp }
        )+}
    )
}
