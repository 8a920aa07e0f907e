pub mod document;
pub mod posting;
pub mod terms;

pub use document::{Certification, Document, Education, Experience, Project};
pub use posting::{JobPosting, TargetRequirements};
