//! Coordinate space marker.
//!
//! Both Waffle and Superb AI store boxes in absolute pixels, so `Pixel` is
//! the only space the IR carries. It stays a type parameter on coordinates
//! so that a future normalized reader cannot hand its values to a pixel
//! writer by accident.

use std::fmt;

/// Marker type for pixel coordinates (absolute values, origin top-left).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
