//! Helper macro for declaring driven-port error enums.
//!
//! Each variant gets a snake-case constructor whose fields accept anything
//! convertible into the declared type, so adapters can write
//! `BlobStoreError::write(err.to_string())`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum SamplePortError {
            Unavailable => "store unavailable",
            Write { message: String } => "write failed: {message}",
            Missing { key: String, attempts: u32 } => "missing {key} after {attempts} attempts",
        }
    }

    #[test]
    fn unit_variants_get_plain_constructors() {
        assert_eq!(SamplePortError::unavailable(), SamplePortError::Unavailable);
    }

    #[test]
    fn string_fields_accept_borrowed_input() {
        let err = SamplePortError::write("disk full");
        assert_eq!(err.to_string(), "write failed: disk full");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = SamplePortError::missing("a.jpg", 3_u32);
        assert_eq!(err.to_string(), "missing a.jpg after 3 attempts");
    }
}
