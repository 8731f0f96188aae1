use crate::{
    db_types::{Certificate, Membership, NewCertificate, NewOrganization, Organization, Role},
    traits::MarketDbError,
};

/// Organization and membership lookups. Memberships are the authorization gate for
/// every mutating marketplace operation: a user acts as lot owner or bidder through
/// their (unique) membership.
#[allow(async_fn_in_trait)]
pub trait MembershipManagement {
    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, MarketDbError>;

    async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, MarketDbError>;

    /// Adds a membership. At most one membership may exist per (org, user) pair;
    /// a second insert is a [`MarketDbError::DuplicateMembership`].
    async fn insert_membership(&self, organization_id: i64, user_id: &str, role: Role)
        -> Result<Membership, MarketDbError>;

    async fn remove_membership(&self, organization_id: i64, user_id: &str) -> Result<bool, MarketDbError>;

    /// The membership for a user identity, or `None` when the user belongs to no
    /// organization.
    async fn membership_for_user(&self, user_id: &str) -> Result<Option<Membership>, MarketDbError>;

    async fn memberships_for_organization(&self, organization_id: i64) -> Result<Vec<Membership>, MarketDbError>;

    //------------------------------------  Certificates  ------------------------------------

    async fn insert_certificate(&self, cert: NewCertificate) -> Result<Certificate, MarketDbError>;

    async fn fetch_certificates(
        &self,
        organization_id: Option<i64>,
        lot_id: Option<i64>,
    ) -> Result<Vec<Certificate>, MarketDbError>;
}
