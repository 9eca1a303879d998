//! crates/roastery_core/src/domain/mod.rs
//!
//! Defines the pure, core data structures for the application.
//! Serde derives are kept so adapters can persist nested documents and the API
//! can render them, but nothing here knows about a database or HTTP.

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// variants are stored and transmitted as lowercase text.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), " value: {}"), s)),
                }
            }
        }
    };
}

mod contact;
mod course;
mod localized;
mod product;
mod profile;
mod sample_order;

pub use contact::{ContactFilter, ContactMessage, InquiryType, MessageStatus, NewContactMessage};
pub use course::{
    Course, CoursePatch, Enrollment, EnrollmentDetails, EnrollmentOutcome, EnrollmentStatus,
    NewCourse, PaymentStatus,
};
pub use localized::{Language, LocalizedText};
pub use product::{NewProduct, Product, ProductFilter, ProductPatch};
pub use profile::{
    AuthSession, FederatedIdentity, NewProfile, ProfileFilter, ProfilePatch, Provider,
    UserCredentials, UserProfile,
};
pub use sample_order::{
    order_number_for, NewSampleOrder, OrderStatus, SampleItem, SampleOrder, SampleOrderFilter,
    ShippingDetails, MAX_SAMPLE_ITEMS,
};
