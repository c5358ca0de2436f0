//! Scholargraph Records: Scholar, Publication and Grant Objects
//!
//! Strongly-typed record shapes for the scholar graph ontology and one thin
//! adapter per object type. Each adapter binds the generic
//! [`EntityService`](scholargraph_ontology::EntityService) to a fixed type
//! name and create-action slug and names its relations:
//!
//! ```text
//!   ScholarProfiles ──GooglePubs (many)──────► GooglePubs
//!         │         ◄──ScholarProfile (one)───────┘
//!         │
//!         └────────PalantirPubMeds (many)────► PalantirPubMeds ──grantSupport──► Grants
//!                  ◄──ScholarProfile (one)────────┘
//!
//!   Publications (OpenAlex import, no links)
//! ```
//!
//! Records narrow raw platform JSON on the way in; a record that does not
//! match its declared shape fails with a validation error instead of being
//! passed through loosely typed.

pub mod google_pub;
pub mod grant;
pub mod publication;
pub mod pubmed;
pub mod scholar;
pub mod schema;

pub use google_pub::{GooglePub, GooglePubs};
pub use grant::{Grant, Grants};
pub use publication::{Publication, Publications};
pub use pubmed::{PubMedArticle, PubMedArticles};
pub use scholar::{ScholarMetrics, ScholarProfile, ScholarProfiles};
pub use schema::{in_memory_platform, ScholarGraph};
