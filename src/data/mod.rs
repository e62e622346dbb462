mod flux_series;
pub use flux_series::FluxSeries;

mod sorted_array;
pub use sorted_array::SortedArray;
