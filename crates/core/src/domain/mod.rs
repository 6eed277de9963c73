pub mod decision;
pub mod family;
pub mod fee_alteration;
pub mod income;
pub mod person;
pub mod placement;
pub mod pricing;
