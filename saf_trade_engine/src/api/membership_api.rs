use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Certificate, Membership, NewCertificate, NewOrganization, Organization, Role},
    traits::{MarketDbError, MembershipManagement},
};

/// Organization and membership management. This is also the authorization resolver:
/// every authenticated user acts through their single membership.
pub struct MembershipApi<B> {
    db: B,
}

impl<B> Debug for MembershipApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MembershipApi")
    }
}

impl<B> MembershipApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MembershipApi<B>
where B: MembershipManagement
{
    pub async fn create_organization(&self, org: NewOrganization) -> Result<Organization, MarketDbError> {
        let org = self.db.insert_organization(org).await?;
        info!("🧑️ Created organization #{} ({})", org.id, org.name);
        Ok(org)
    }

    pub async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, MarketDbError> {
        self.db.fetch_organization(id).await
    }

    /// The organization a user acts for, or `None` when they belong to none. The
    /// distinction matters: "no organization" is a usable state, not an error.
    pub async fn org_for_user(&self, user_id: &str) -> Result<Option<Membership>, MarketDbError> {
        self.db.membership_for_user(user_id).await
    }

    /// Installs the founding admin of a freshly created organization. This is the
    /// only membership write that skips the admin check; a new organization has no
    /// admins yet to act for it.
    pub async fn bootstrap_admin(&self, organization_id: i64, user_id: &str) -> Result<Membership, MarketDbError> {
        let membership = self.db.insert_membership(organization_id, user_id, Role::Admin).await?;
        info!("🧑️ {user_id} is the founding admin of organization #{organization_id}");
        Ok(membership)
    }

    /// Add a member. Only admins of the organization may manage members; the caller
    /// passes their own membership for the check.
    pub async fn add_member(
        &self,
        acting: &Membership,
        organization_id: i64,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, MarketDbError> {
        self.require_admin(acting, organization_id)?;
        self.db.insert_membership(organization_id, user_id, role).await
    }

    pub async fn remove_member(
        &self,
        acting: &Membership,
        organization_id: i64,
        user_id: &str,
    ) -> Result<bool, MarketDbError> {
        self.require_admin(acting, organization_id)?;
        self.db.remove_membership(organization_id, user_id).await
    }

    pub async fn members_of(&self, organization_id: i64) -> Result<Vec<Membership>, MarketDbError> {
        self.db.memberships_for_organization(organization_id).await
    }

    pub async fn add_certificate(&self, cert: NewCertificate) -> Result<Certificate, MarketDbError> {
        self.db.insert_certificate(cert).await
    }

    pub async fn fetch_certificates(
        &self,
        organization_id: Option<i64>,
        lot_id: Option<i64>,
    ) -> Result<Vec<Certificate>, MarketDbError> {
        self.db.fetch_certificates(organization_id, lot_id).await
    }

    fn require_admin(&self, acting: &Membership, organization_id: i64) -> Result<(), MarketDbError> {
        if acting.organization_id != organization_id || acting.role != Role::Admin {
            return Err(MarketDbError::Forbidden(format!(
                "user {} is not an admin of organization {organization_id}",
                acting.user_id
            )));
        }
        Ok(())
    }
}
