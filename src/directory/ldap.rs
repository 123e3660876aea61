//! LDAP user directory.
//!
//! # Responsibilities
//! - Resolve a DN by exact base-scope lookup
//! - Fall back to a subtree search over user entries matched by CN,
//!   case-insensitively
//! - Derive roles from groups listing the user as `member`
//!
//! # Design Decisions
//! - Uses the synchronous `ldap3` client on the blocking pool; one connection
//!   per lookup, released before returning
//! - A failed role query degrades to an empty role list
//! - Connect or bind failure is an outage, not a missing user

use async_trait::async_trait;
use ldap3::result::Result as OpResult;
use ldap3::{ldap_escape, LdapConn, LdapConnSettings, Scope, SearchEntry, SearchResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LdapConfig;
use crate::directory::dn;
use crate::directory::{DirectoryError, ResolvedUser, UserDirectory};

/// LDAP result code for a missing base object.
const NO_SUCH_OBJECT: u32 = 32;

const USER_ATTRIBUTES: [&str; 2] = ["givenName", "sn"];

/// A user entry as read from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

impl DirectoryEntry {
    fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            given_name: first_attribute(&entry.attrs, "givenName"),
            surname: first_attribute(&entry.attrs, "sn"),
            dn: entry.dn,
        }
    }
}

/// First value of an attribute, matching the name case-insensitively.
fn first_attribute(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first().cloned())
}

/// Pick the first entry whose CN equals `cn`, ignoring case.
pub fn select_by_cn(entries: Vec<DirectoryEntry>, cn: &str) -> Option<DirectoryEntry> {
    let wanted = cn.to_lowercase();
    entries.into_iter().find(|entry| {
        dn::extract_cn(&entry.dn)
            .map(|found| found.to_lowercase() == wanted)
            .unwrap_or(false)
    })
}

/// Turn group DNs into role names, dropping groups without the prefix.
pub fn roles_from_groups<'a>(
    group_dns: impl IntoIterator<Item = &'a str>,
    prefix: &str,
) -> Vec<String> {
    let mut roles: Vec<String> = group_dns
        .into_iter()
        .filter_map(|group| dn::extract_role_name(group, prefix))
        .collect();
    roles.sort();
    roles.dedup();
    roles
}

pub struct LdapDirectory {
    config: Arc<LdapConfig>,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl UserDirectory for LdapDirectory {
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError> {
        let config = self.config.clone();
        let identity = identity.to_string();

        tokio::task::spawn_blocking(move || lookup_blocking(&config, &identity))
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("LDAP lookup task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "ldap"
    }
}

fn lookup_blocking(config: &LdapConfig, identity: &str) -> Result<ResolvedUser, DirectoryError> {
    if identity.trim().is_empty() {
        return Err(DirectoryError::UserNotFound(identity.to_string()));
    }

    let mut conn = connect(config)?;
    let result = resolve(&mut conn, config, identity);
    if let Err(e) = conn.unbind() {
        tracing::debug!(error = %e, "LDAP unbind failed");
    }
    result
}

fn connect(config: &LdapConfig) -> Result<LdapConn, DirectoryError> {
    let settings =
        LdapConnSettings::new().set_conn_timeout(Duration::from_secs(config.connect_timeout_secs));

    let mut conn = LdapConn::with_settings(settings, &config.url).map_err(|e| {
        tracing::error!(url = %config.url, error = %e, "LDAP connection failed");
        DirectoryError::Unavailable(e.to_string())
    })?;

    conn.simple_bind(&config.bind_dn, &config.bind_password)
        .and_then(|res| res.success())
        .map_err(|e| {
            tracing::error!(bind_dn = %config.bind_dn, error = %e, "LDAP bind failed");
            DirectoryError::Unavailable(e.to_string())
        })?;

    Ok(conn)
}

/// The three directory reads a lookup needs.
trait DirectoryOps {
    /// Base-scope read of `full_dn`; `None` when the entry does not exist.
    fn find_exact(&mut self, full_dn: &str) -> OpResult<Option<DirectoryEntry>>;

    /// Every user entry of `object_class` under `base_dn`.
    fn search_users(
        &mut self,
        base_dn: &str,
        object_class: &str,
    ) -> OpResult<Vec<DirectoryEntry>>;

    /// DNs of the groups under `base_dn` listing `member_dn` as `member`.
    fn member_groups(&mut self, base_dn: &str, member_dn: &str) -> OpResult<Vec<String>>;
}

impl DirectoryOps for LdapConn {
    fn find_exact(&mut self, full_dn: &str) -> OpResult<Option<DirectoryEntry>> {
        let SearchResult(entries, result) =
            self.search(full_dn, Scope::Base, "(objectClass=*)", USER_ATTRIBUTES)?;
        if result.rc == NO_SUCH_OBJECT {
            return Ok(None);
        }
        result.success()?;

        Ok(entries
            .into_iter()
            .next()
            .map(|entry| DirectoryEntry::from_search_entry(SearchEntry::construct(entry))))
    }

    fn search_users(
        &mut self,
        base_dn: &str,
        object_class: &str,
    ) -> OpResult<Vec<DirectoryEntry>> {
        let filter = format!("(objectClass={})", ldap_escape(object_class));
        let (entries, _) = self
            .search(base_dn, Scope::Subtree, &filter, USER_ATTRIBUTES)?
            .success()?;

        Ok(entries
            .into_iter()
            .map(|entry| DirectoryEntry::from_search_entry(SearchEntry::construct(entry)))
            .collect())
    }

    fn member_groups(&mut self, base_dn: &str, member_dn: &str) -> OpResult<Vec<String>> {
        let filter = format!("(member={})", ldap_escape(member_dn));
        let (entries, _) = self
            .search(base_dn, Scope::Subtree, &filter, vec!["cn"])?
            .success()?;

        Ok(entries
            .into_iter()
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }
}

fn resolve(
    ops: &mut impl DirectoryOps,
    config: &LdapConfig,
    identity: &str,
) -> Result<ResolvedUser, DirectoryError> {
    let full_dn = dn::ensure_full_dn(identity, &config.base_dn);
    let mut attempts = 1;
    let mut failures = 0;

    let mut found = match ops.find_exact(&full_dn) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(dn = %full_dn, error = %e, "Exact LDAP lookup failed");
            failures += 1;
            None
        }
    };

    if found.is_none() {
        if let Some(cn) = dn::extract_cn(identity) {
            attempts += 1;
            match ops.search_users(&config.base_dn, &config.user_object_class) {
                Ok(entries) => {
                    found = select_by_cn(entries, &cn);
                    if let Some(entry) = &found {
                        tracing::debug!(requested = %identity, actual = %entry.dn, "Matched user by CN");
                    }
                }
                Err(e) => {
                    tracing::warn!(cn = %cn, error = %e, "LDAP user search failed");
                    failures += 1;
                }
            }
        } else {
            tracing::debug!(dn = %identity, "No CN in DN, skipping fallback search");
        }
    }

    // Every attempt errored: the directory is down, not the user missing
    let Some(entry) = found else {
        if failures == attempts {
            return Err(DirectoryError::Unavailable(format!(
                "LDAP lookups failed for {}",
                identity
            )));
        }
        tracing::debug!(dn = %identity, "User not found in LDAP");
        return Err(DirectoryError::UserNotFound(identity.to_string()));
    };

    let roles = match ops.member_groups(&config.base_dn, &entry.dn) {
        Ok(groups) => roles_from_groups(groups.iter().map(String::as_str), &config.role_prefix),
        Err(e) => {
            tracing::warn!(dn = %entry.dn, error = %e, "LDAP group query failed, continuing without roles");
            Vec::new()
        }
    };

    tracing::debug!(dn = %entry.dn, roles = ?roles, "Resolved LDAP user");

    Ok(ResolvedUser {
        dn: identity.to_string(),
        given_name: entry.given_name,
        surname: entry.surname,
        roles,
    })
}
