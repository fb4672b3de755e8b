/// Sample types with a reserved value that marks a pixel without valid data.
/// Floating point types use NaN, unsigned types their maximum and signed types their minimum value.
pub trait Nodata: PartialEq + Sized + Copy {
    const NODATA: Self;

    #[inline]
    fn is_nodata(self) -> bool {
        self == Self::NODATA
    }
}

macro_rules! impl_nodata_fixed_point {
    ( $t:ident, $nodata:ident ) => {
        impl Nodata for $t {
            const NODATA: $t = $t::$nodata;
        }
    };
}

macro_rules! impl_nodata_floating_point {
    ( $t:ident ) => {
        impl Nodata for $t {
            const NODATA: $t = $t::NAN;

            fn is_nodata(self) -> bool {
                self.is_nan()
            }
        }
    };
}

impl_nodata_fixed_point!(u8, MAX);
impl_nodata_fixed_point!(u16, MAX);
impl_nodata_fixed_point!(u32, MAX);
impl_nodata_fixed_point!(u64, MAX);
impl_nodata_fixed_point!(i8, MIN);
impl_nodata_fixed_point!(i16, MIN);
impl_nodata_fixed_point!(i32, MIN);
impl_nodata_fixed_point!(i64, MIN);

impl_nodata_floating_point!(f32);
impl_nodata_floating_point!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_values() {
        assert!(u8::MAX.is_nodata());
        assert!(i16::MIN.is_nodata());
        assert!(!0i32.is_nodata());
        assert!(f32::NAN.is_nodata());
        assert!(f64::NODATA.is_nodata());
        assert!(!1.5f64.is_nodata());
        assert!(!(-9999.0f32).is_nodata());
    }
}
