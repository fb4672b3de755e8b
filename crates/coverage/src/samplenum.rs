use crate::{DataType, Nodata};

/// Type requirements for the samples stored in a raster
pub trait SampleNum:
    Copy + Nodata + num::NumCast + num::Bounded + num::Zero + PartialOrd + std::fmt::Debug + Send + Sync + 'static
{
    const TYPE: DataType;
}

macro_rules! impl_sample_num {
    ( $t:ident, $data_type:ident ) => {
        impl SampleNum for $t {
            const TYPE: DataType = DataType::$data_type;
        }
    };
}

impl_sample_num!(i8, Int8);
impl_sample_num!(u8, Uint8);
impl_sample_num!(i16, Int16);
impl_sample_num!(u16, Uint16);
impl_sample_num!(i32, Int32);
impl_sample_num!(u32, Uint32);
impl_sample_num!(i64, Int64);
impl_sample_num!(u64, Uint64);
impl_sample_num!(f32, Float32);
impl_sample_num!(f64, Float64);
