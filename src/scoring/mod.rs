//! Company features, round ranking, investment scoring and investor aggregation.
//!
//! Stages run leaf-first: [`company`] enriches the company table (using
//! [`grouping`] for peer groups), [`rank`] orders rounds inside each series,
//! [`investment`] scores every investment event, and [`investor`] reduces the
//! scored events to one number per investor.

pub mod company;
pub mod grouping;
pub mod investment;
pub mod investor;
pub mod rank;
pub mod types;
pub mod utility;
