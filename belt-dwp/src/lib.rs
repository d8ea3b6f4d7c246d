#![no_std]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg"
)]

//! ## Usage
//!
//! ```
//! use belt_dwp::BeltDwp;
//! use hex_literal::hex;
//!
//! // Standard belt key and IV from STB 34.101.31 appendix A
//! const KEY: [u8; 32] =
//!     hex!("E9DEE72C 8F0C0FA6 2DDB49F4 6F739647 06075316 ED247A37 39CBA383 03A98BF6");
//! const IV: [u8; 16] = hex!("BE329713 43FC9A48 A02A885F 194B09A1");
//!
//! # fn main() -> Result<(), belt_dwp::Error> {
//! let dwp = BeltDwp::new(&KEY)?;
//!
//! let header = b"critical header";
//! let mut buffer = *b"confidential payload";
//!
//! // Encrypt the payload in place and authenticate it together with the header
//! let tag = dwp.wrap_in_place(&IV, header, &mut buffer);
//! assert_ne!(&buffer, b"confidential payload");
//!
//! // Verify the tag and decrypt the payload in place
//! dwp.unwrap_in_place(&IV, header, &mut buffer, &tag)?;
//! assert_eq!(&buffer, b"confidential payload");
//! # Ok(())
//! # }
//! ```

use core::fmt;

mod block;
mod ctr;
mod dwp;
mod gf;

pub use dwp::{BeltDwp, DwpState};

/// Length of the DWP initialization vector in octets.
pub const IV_SIZE: usize = 16;

/// Length of the DWP authentication tag in octets.
pub const TAG_SIZE: usize = 8;

/// DWP initialization vector.
pub type Iv = [u8; IV_SIZE];

/// DWP authentication tag.
pub type Tag = [u8; TAG_SIZE];

/// DWP errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Key was not 16, 24, or 32 octets long.
    InvalidKeyLength,
    /// Authentication tag did not match the protected data.
    BadMac,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKeyLength => write!(f, "belt-dwp: invalid key length"),
            Error::BadMac => write!(f, "belt-dwp: authentication tag mismatch"),
        }
    }
}

impl core::error::Error for Error {}
