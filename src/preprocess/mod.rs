/// Preprocessing and correction of EEM grids.
///
/// All operations either return a new [`Eem`](crate::data::model::Eem)
/// (cropping) or keep the source grid shape and only rescale intensities
/// (blank subtraction, Raman normalization, inner filter correction).
pub mod correction;
pub mod crop;

pub use correction::{PreprocessError, inner_filter_correction, raman_normalize, subtract_blank};
pub use crop::{crop, crop_emission, crop_excitation};
