//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod leave;
mod membership;
mod policy;

pub use leave::{LeaveRecord, LeaveRecordInput, LeaveStatus, parse_leave_date};
pub use membership::{AccountId, GroupId, MembershipDelta};
pub use policy::{LeaveAggregation, LongTermPolicy, LongTermPolicyInput, ThresholdCombinator};
