//! Value codec: typed values <-> canonical string cells
//!
//! Every stored value is a string. This module defines the pure, stateless
//! mapping between the supported native types and their canonical string
//! encoding:
//!
//! - integers: decimal, sign-aware per width
//! - floats: Rust `Display` shortest form; format-then-parse reproduces the
//!   original bit pattern for all finite values
//! - bool: `true` / `false`
//! - byte blobs: standard base64 (the alphabet excludes the `|` delimiter)
//! - composites (vectors, quaternion, color, rect): scalar components joined
//!   by `|`, split and parsed positionally on decode
//!
//! Type information is not persisted. The caller must request the same type
//! on read that was used on write; anything else is a [`Error::Decode`].

use crate::error::{Error, Result};
use crate::types::{Color, Quat, Rect, Vec2, Vec3, Vec4};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Separator between the scalar components of a composite cell
pub const COMPONENT_SEPARATOR: char = '|';

/// A value the preference store can encode, decode, and default.
///
/// `zero()` is the documented value a typed getter returns for an absent
/// key: empty string, `0`, `false`, empty byte blob, zero-valued composite.
pub trait PrefValue: Sized {
    /// Type name used in decode error messages
    const TYPE_NAME: &'static str;

    /// Encode the value into its canonical string cell.
    fn encode(&self) -> String;

    /// Decode a string cell back into the value.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] when the cell does not parse as this type
    /// (malformed numeric text, wrong component count).
    fn decode(cell: &str) -> Result<Self>;

    /// The absent-key default for this type.
    fn zero() -> Self;
}

impl PrefValue for String {
    const TYPE_NAME: &'static str = "string";

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(cell: &str) -> Result<Self> {
        Ok(cell.to_string())
    }

    fn zero() -> Self {
        String::new()
    }
}

impl PrefValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(cell: &str) -> Result<Self> {
        // Accept the capitalized spellings older writers produced.
        if cell.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if cell.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(Error::decode(Self::TYPE_NAME, cell))
        }
    }

    fn zero() -> Self {
        false
    }
}

impl PrefValue for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn encode(&self) -> String {
        BASE64.encode(self)
    }

    fn decode(cell: &str) -> Result<Self> {
        BASE64
            .decode(cell)
            .map_err(|_| Error::decode(Self::TYPE_NAME, cell))
    }

    fn zero() -> Self {
        Vec::new()
    }
}

/// Implements [`PrefValue`] for types whose `Display`/`FromStr` pair is the
/// canonical encoding (all integer widths and both float widths).
macro_rules! impl_scalar_pref_value {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl PrefValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn encode(&self) -> String {
                    self.to_string()
                }

                fn decode(cell: &str) -> Result<Self> {
                    cell.parse().map_err(|_| Error::decode(Self::TYPE_NAME, cell))
                }

                fn zero() -> Self {
                    0 as $ty
                }
            }
        )+
    };
}

impl_scalar_pref_value! {
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
}

/// Join float components with the composite separator.
fn join_components(components: &[f32]) -> String {
    let mut cell = String::new();
    for (i, c) in components.iter().enumerate() {
        if i > 0 {
            cell.push(COMPONENT_SEPARATOR);
        }
        cell.push_str(&c.to_string());
    }
    cell
}

/// Split a composite cell into exactly `N` float components.
fn split_components<const N: usize>(cell: &str, type_name: &'static str) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut parts = cell.split(COMPONENT_SEPARATOR);
    for slot in out.iter_mut() {
        let part = parts.next().ok_or_else(|| Error::decode(type_name, cell))?;
        *slot = part
            .parse()
            .map_err(|_| Error::decode(type_name, cell))?;
    }
    if parts.next().is_some() {
        return Err(Error::decode(type_name, cell));
    }
    Ok(out)
}

/// Implements [`PrefValue`] for a composite type with fixed field order.
macro_rules! impl_composite_pref_value {
    ($ty:ty => $name:literal, [$($field:ident),+]) => {
        impl PrefValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn encode(&self) -> String {
                join_components(&[$(self.$field),+])
            }

            fn decode(cell: &str) -> Result<Self> {
                let [$($field),+] = split_components(cell, Self::TYPE_NAME)?;
                Ok(Self { $($field),+ })
            }

            fn zero() -> Self {
                Self::ZERO
            }
        }
    };
}

impl_composite_pref_value!(Vec2 => "vec2", [x, y]);
impl_composite_pref_value!(Vec3 => "vec3", [x, y, z]);
impl_composite_pref_value!(Vec4 => "vec4", [x, y, z, w]);
impl_composite_pref_value!(Quat => "quat", [x, y, z, w]);
impl_composite_pref_value!(Color => "color", [r, g, b, a]);
impl_composite_pref_value!(Rect => "rect", [x, y, width, height]);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip<T: PrefValue + PartialEq + std::fmt::Debug>(value: T) {
        let cell = value.encode();
        let back = T::decode(&cell).unwrap();
        assert_eq!(back, value, "cell was {cell:?}");
    }

    // ========== Scalar encodings ==========

    #[test]
    fn test_string_identity() {
        roundtrip(String::from("hello = world | with @ noise"));
        assert_eq!(String::zero(), "");
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(true.encode(), "true");
        assert_eq!(false.encode(), "false");
        assert!(bool::decode("True").unwrap());
        assert!(!bool::decode("False").unwrap());
        assert!(bool::decode("yes").is_err());
        assert!(!bool::zero());
    }

    #[test]
    fn test_integer_widths() {
        roundtrip(i16::MIN);
        roundtrip(i32::MIN);
        roundtrip(i64::MIN);
        roundtrip(u16::MAX);
        roundtrip(u32::MAX);
        roundtrip(u64::MAX);
        assert_eq!((-7i32).encode(), "-7");
        assert_eq!(i32::zero(), 0);
    }

    #[test]
    fn test_integer_decode_rejects_garbage() {
        assert!(i32::decode("12.5").is_err());
        assert!(u16::decode("-1").is_err());
        assert!(i64::decode("").is_err());
    }

    #[test]
    fn test_float_special_values() {
        roundtrip(0.0f32);
        roundtrip(f32::MAX);
        roundtrip(f64::MIN_POSITIVE);
        // Non-finite values still parse back, though not bit-exactly for NaN
        assert!(f32::decode(&f32::INFINITY.encode()).unwrap().is_infinite());
        assert!(f64::decode(&f64::NAN.encode()).unwrap().is_nan());
    }

    #[test]
    fn test_bytes_base64() {
        assert_eq!(b"foobar".to_vec().encode(), "Zm9vYmFy");
        roundtrip(vec![0u8, 1, 2, 255]);
        roundtrip(Vec::<u8>::new());
        assert!(Vec::<u8>::decode("not base64!!!").is_err());
        // base64 alphabet never collides with the composite separator
        assert!(!vec![0u8; 64].encode().contains(COMPONENT_SEPARATOR));
    }

    // ========== Composite encodings ==========

    #[test]
    fn test_vector3_cell_layout() {
        let v = Vec3::new(3.0, 4.0, 5.0);
        assert_eq!(v.encode(), "3|4|5");
        assert_eq!(Vec3::decode("3|4|5").unwrap(), v);
    }

    #[test]
    fn test_composite_roundtrips() {
        roundtrip(Vec2::new(1.5, -2.25));
        roundtrip(Vec4::new(0.1, 0.2, 0.3, 0.4));
        roundtrip(Quat::new(0.0, 0.7071068, 0.0, 0.7071068));
        roundtrip(Color::new(0.25, 0.5, 0.75, 1.0));
        roundtrip(Rect::new(-10.0, 20.0, 640.0, 480.0));
    }

    #[test]
    fn test_composite_wrong_component_count() {
        assert!(Vec3::decode("1|2").is_err());
        assert!(Vec3::decode("1|2|3|4").is_err());
        assert!(Vec2::decode("").is_err());
    }

    #[test]
    fn test_composite_malformed_scalar() {
        let err = Vec3::decode("1|two|3").unwrap_err();
        match err {
            Error::Decode { type_name, .. } => assert_eq!(type_name, "vec3"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_composite_zero() {
        assert_eq!(Vec3::zero(), Vec3::ZERO);
        assert_eq!(Rect::zero(), Rect::ZERO);
    }

    // ========== Round-trip properties ==========

    proptest! {
        #[test]
        fn prop_i64_roundtrip(v in any::<i64>()) {
            prop_assert_eq!(i64::decode(&v.encode()).unwrap(), v);
        }

        #[test]
        fn prop_u64_roundtrip(v in any::<u64>()) {
            prop_assert_eq!(u64::decode(&v.encode()).unwrap(), v);
        }

        #[test]
        fn prop_f32_roundtrip_bit_exact(v in any::<f32>()) {
            prop_assume!(v.is_finite());
            prop_assert_eq!(f32::decode(&v.encode()).unwrap().to_bits(), v.to_bits());
        }

        #[test]
        fn prop_f64_roundtrip_bit_exact(v in any::<f64>()) {
            prop_assume!(v.is_finite());
            prop_assert_eq!(f64::decode(&v.encode()).unwrap().to_bits(), v.to_bits());
        }

        #[test]
        fn prop_string_roundtrip(s in ".*") {
            prop_assert_eq!(String::decode(&s.encode()).unwrap(), s);
        }

        #[test]
        fn prop_bytes_roundtrip(b in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(Vec::<u8>::decode(&b.encode()).unwrap(), b);
        }

        #[test]
        fn prop_vec3_roundtrip(x in any::<f32>(), y in any::<f32>(), z in any::<f32>()) {
            prop_assume!(x.is_finite() && y.is_finite() && z.is_finite());
            let v = Vec3::new(x, y, z);
            prop_assert_eq!(Vec3::decode(&v.encode()).unwrap(), v);
        }
    }
}
