//! Typed extraction of response payloads.
//!
//! Most controller acknowledgements share [`NrcAckResponse`](crate::commands::NrcAckResponse),
//! but the few responses that carry data have their own payload type. [`ExtractInner`]
//! pulls such a payload out of a [`CommandResponse`](crate::packets::CommandResponse)
//! without a hand-written `match`.
//!
//! ```
//! use nrc_rmi::ExtractInner;
//! use nrc_rmi::commands::NrcReadPositionResponse;
//! use nrc_rmi::packets::CommandResponse;
//!
//! # fn example(response: CommandResponse) {
//! let resp: Option<NrcReadPositionResponse> = response.into_inner();
//! if let Some(resp) = resp {
//!     println!("J1 = {}", resp.position[0]);
//! }
//! # }
//! ```

/// Trait for extracting inner types from enums.
pub trait ExtractInner<T> {
    /// Borrow the inner value if the variant holds a `T`.
    fn as_inner(&self) -> Option<&T>;

    /// Take the inner value if the variant holds a `T`.
    fn into_inner(self) -> Option<T>;
}

/// Implements [`ExtractInner`] for one `enum::Variant(inner)` pairing.
///
/// ```ignore
/// impl_extract_inner!(CommandResponse, NrcReadPosition, NrcReadPositionResponse);
/// ```
#[macro_export]
macro_rules! impl_extract_inner {
    ($enum:ty, $variant:ident, $inner:ty) => {
        impl $crate::ExtractInner<$inner> for $enum {
            #[inline]
            fn as_inner(&self) -> Option<&$inner> {
                match self {
                    Self::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            #[inline]
            fn into_inner(self) -> Option<$inner> {
                match self {
                    Self::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}
