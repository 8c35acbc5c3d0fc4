//! Authenticated GitHub user

use std::collections::BTreeMap;

use panel_api::{OrganizationResponse, UserResponse};
use secrecy::SecretString;

/// A GitHub user that belongs to at least one team of the organization
#[derive(Debug, Clone)]
pub struct User {
    /// GitHub access token, reused for GraphQL queries on the user's behalf
    pub token: SecretString,
    pub name: String,
    pub login: String,
    /// Team name to member logins
    pub teams: BTreeMap<String, Vec<String>>,
}

impl User {
    /// Whether `login` is a member of `team`. Unknown teams have no members.
    pub fn is_team_member(&self, team: &str, login: &str) -> bool {
        self.teams
            .get(team)
            .is_some_and(|members| members.iter().any(|member| member == login))
    }

    /// Dashboard view of the user (without the token)
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            name: self.name.clone(),
            login: self.login.clone(),
            organization: OrganizationResponse {
                teams: self.teams.clone(),
            },
        }
    }
}
