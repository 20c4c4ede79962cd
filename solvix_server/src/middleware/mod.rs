mod acl;
mod stripe_signature;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use stripe_signature::{StripeSignatureMiddlewareFactory, StripeSignatureMiddlewareService, STRIPE_SIGNATURE_HEADER};
