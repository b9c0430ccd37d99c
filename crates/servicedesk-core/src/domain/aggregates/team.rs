//! Team aggregate
//!
//! A team groups support staff. Membership is a relation between the team and
//! a user; removing a member deletes the relation, never the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::events::{DomainEvent, TeamEvent};
use crate::domain::value_objects::ActorId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    members: Vec<TeamMember>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: ActorId,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Leader,
    #[default]
    Member,
}

impl Team {
    pub fn create(id: impl Into<String>, name: impl Into<String>, description: Option<String>, now: DateTime<Utc>) -> Self {
        let mut team = Self {
            id: id.into(),
            name: name.into(),
            description,
            members: vec![],
            created_at: now,
            events: vec![],
        };
        team.raise_event(DomainEvent::Team(TeamEvent::Created {
            team_id: team.id.clone(),
            name: team.name.clone(),
        }));
        team
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn members(&self) -> &[TeamMember] { &self.members }
    pub fn member_count(&self) -> usize { self.members.len() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn leader(&self) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.role == TeamRole::Leader)
    }

    pub fn is_member(&self, user_id: &ActorId) -> bool {
        self.members.iter().any(|m| &m.user_id == user_id)
    }

    pub fn add_member(&mut self, user_id: ActorId, role: TeamRole, now: DateTime<Utc>) -> Result<(), TeamError> {
        if self.is_member(&user_id) {
            return Err(TeamError::AlreadyMember(user_id.to_string()));
        }

        self.members.push(TeamMember { user_id: user_id.clone(), role, joined_at: now });
        self.raise_event(DomainEvent::Team(TeamEvent::MemberAdded {
            team_id: self.id.clone(),
            user_id,
            role,
        }));
        Ok(())
    }

    pub fn remove_member(&mut self, user_id: &ActorId) -> Result<TeamMember, TeamError> {
        let index = self
            .members
            .iter()
            .position(|m| &m.user_id == user_id)
            .ok_or_else(|| TeamError::NotMember(user_id.to_string()))?;

        let member = self.members.remove(index);
        self.raise_event(DomainEvent::Team(TeamEvent::MemberRemoved {
            team_id: self.id.clone(),
            user_id: user_id.clone(),
        }));
        Ok(member)
    }

    pub fn change_role(&mut self, user_id: &ActorId, role: TeamRole) -> Result<(), TeamError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| &m.user_id == user_id)
            .ok_or_else(|| TeamError::NotMember(user_id.to_string()))?;

        if member.role == role {
            return Ok(());
        }
        member.role = role;

        self.raise_event(DomainEvent::Team(TeamEvent::RoleChanged {
            team_id: self.id.clone(),
            user_id: user_id.clone(),
            role,
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamError {
    #[error("user {0} is already a member of this team")]
    AlreadyMember(String),

    #[error("user {0} is not a member of this team")]
    NotMember(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_team() -> Team {
        Team::create("team-001", "Network Support", None, Utc::now())
    }

    #[test]
    fn test_membership_lifecycle() {
        let mut team = network_team();
        let mike = ActorId::new("staff-001");
        let sarah = ActorId::new("staff-002");

        team.add_member(mike.clone(), TeamRole::Leader, Utc::now()).unwrap();
        team.add_member(sarah.clone(), TeamRole::Member, Utc::now()).unwrap();

        assert_eq!(team.member_count(), 2);
        assert_eq!(team.leader().map(|m| &m.user_id), Some(&mike));

        let removed = team.remove_member(&sarah).unwrap();
        assert_eq!(removed.user_id, sarah);
        assert!(!team.is_member(&sarah));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut team = network_team();
        let mike = ActorId::new("staff-001");

        team.add_member(mike.clone(), TeamRole::Member, Utc::now()).unwrap();
        assert_eq!(
            team.add_member(mike, TeamRole::Leader, Utc::now()),
            Err(TeamError::AlreadyMember("staff-001".into()))
        );
    }

    #[test]
    fn test_change_role() {
        let mut team = network_team();
        let mike = ActorId::new("staff-001");
        team.add_member(mike.clone(), TeamRole::Member, Utc::now()).unwrap();
        team.take_events();

        team.change_role(&mike, TeamRole::Leader).unwrap();
        team.change_role(&mike, TeamRole::Leader).unwrap();

        assert_eq!(team.leader().map(|m| &m.user_id), Some(&mike));
        assert_eq!(team.take_events().len(), 1);
        assert!(matches!(
            team.change_role(&ActorId::new("nobody"), TeamRole::Member),
            Err(TeamError::NotMember(_))
        ));
    }
}
