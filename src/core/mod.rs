pub mod aggregation;
pub mod load;
pub mod loads;
pub mod psychrometrics;
pub mod reference;
pub mod units;
