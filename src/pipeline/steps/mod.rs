pub mod feature_selector;
pub mod rate_reducer;
pub mod subject_selector;
pub mod windower;

pub use feature_selector::FeatureSelector;
pub use rate_reducer::RateReducer;
pub use subject_selector::SubjectSelector;
pub use windower::Windower;
