// src/permissions/mod.rs
//
// Access rules for every (resource, action) pair. A policy is a list of
// rules that must all hold; a rule is either one predicate or a group of
// which any one suffices. Pairs without a policy are denied.
//
// List and create are checked before any target exists (collection phase).
// Retrieve, update and destroy are checked against the resolved target
// (object phase); callers resolve the target first so a missing row answers
// NotFound before permissions are looked at.

mod predicates;

pub use predicates::{Evaluation, Predicate};

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::ApiError;
use crate::models::{Comment, Contributor, Issue, Project, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Project,
    Contributor,
    Issue,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collection,
    Object,
}

impl Action {
    pub fn is_read_only(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }

    pub fn phase(self) -> Phase {
        match self {
            Action::List | Action::Create => Phase::Collection,
            Action::Retrieve | Action::Update | Action::PartialUpdate | Action::Destroy => Phase::Object,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Project => "project",
            Resource::Contributor => "contributor",
            Resource::Issue => "issue",
            Resource::Comment => "comment",
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial update",
            Action::Destroy => "destroy",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Require(Predicate),
    AnyOf(&'static [Predicate]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Rules(&'static [Rule]),
    /// Routed but switched off for the resource.
    Disabled,
}

/// The object a retrieve/update/destroy acts on. A comment carries its
/// issue so the enclosing project can be reached.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Project(&'a Project),
    Contributor(&'a Contributor),
    Issue(&'a Issue),
    Comment(&'a Comment, &'a Issue),
}

/// Who is asking and in which project. `project` is the path project for
/// nested resources and the target itself for project object checks; it is
/// `None` only for project list/create.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub actor: Option<&'a User>,
    pub project: Option<&'a Project>,
    pub is_contributor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    NotPermitted,
    Disabled,
    Failed(Predicate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// The error for an action that is routed but has no implementation.
pub fn unsupported(resource: Resource, action: Action) -> ApiError {
    ApiError::MethodNotSupported(format!("{} is not supported for {}", action, resource))
}

impl Decision {
    pub fn into_result(self, resource: Resource, action: Action) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(ApiError::Unauthenticated(
                "authentication credentials were not provided".to_string(),
            )),
            Decision::Deny(DenyReason::NotPermitted) => Err(ApiError::Forbidden(
                "action not permitted for this resource".to_string(),
            )),
            Decision::Deny(DenyReason::Disabled) => Err(unsupported(resource, action)),
            Decision::Deny(DenyReason::Failed(predicate)) => Err(ApiError::Forbidden(predicate.to_string())),
        }
    }
}

use Predicate::*;
use Rule::*;

const AUTHENTICATED: &[Rule] = &[Require(IsAuthenticated)];
const READ_OR_OWNER: &[Rule] = &[Require(IsAuthenticated), AnyOf(&[ReadSafe, IsOwner])];
const OWNER: &[Rule] = &[Require(IsOwner)];
const MEMBER: &[Rule] = &[Require(IsContributorOrOwner)];

const STANDARD: &[(Resource, Action, Policy)] = &[
    (Resource::Project, Action::List, Policy::Rules(READ_OR_OWNER)),
    (Resource::Project, Action::Create, Policy::Rules(AUTHENTICATED)),
    (Resource::Project, Action::Retrieve, Policy::Rules(MEMBER)),
    (Resource::Project, Action::Update, Policy::Rules(OWNER)),
    (Resource::Project, Action::PartialUpdate, Policy::Disabled),
    (Resource::Project, Action::Destroy, Policy::Rules(OWNER)),
    (Resource::Contributor, Action::List, Policy::Rules(MEMBER)),
    (Resource::Contributor, Action::Create, Policy::Rules(OWNER)),
    (Resource::Contributor, Action::Destroy, Policy::Rules(OWNER)),
    (Resource::Issue, Action::List, Policy::Rules(MEMBER)),
    (Resource::Issue, Action::Create, Policy::Rules(MEMBER)),
    (Resource::Issue, Action::Update, Policy::Rules(OWNER)),
    (Resource::Issue, Action::PartialUpdate, Policy::Disabled),
    (Resource::Issue, Action::Destroy, Policy::Rules(OWNER)),
    (Resource::Comment, Action::List, Policy::Rules(MEMBER)),
    (Resource::Comment, Action::Create, Policy::Rules(MEMBER)),
    (Resource::Comment, Action::Retrieve, Policy::Rules(MEMBER)),
    (Resource::Comment, Action::Update, Policy::Rules(OWNER)),
    (Resource::Comment, Action::PartialUpdate, Policy::Disabled),
    (Resource::Comment, Action::Destroy, Policy::Rules(OWNER)),
];

/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<(Resource, Action), Policy>,
}

impl PolicyTable {
    pub fn standard() -> Self {
        Self::from_entries(STANDARD)
    }

    pub fn from_entries(entries: &[(Resource, Action, Policy)]) -> Self {
        let policies = entries
            .iter()
            .map(|&(resource, action, policy)| ((resource, action), policy))
            .collect();
        PolicyTable { policies }
    }

    pub fn policy(&self, resource: Resource, action: Action) -> Option<Policy> {
        self.policies.get(&(resource, action)).copied()
    }

    pub fn authorize(
        &self,
        resource: Resource,
        action: Action,
        subject: &Subject<'_>,
        target: Option<Target<'_>>,
    ) -> Decision {
        let rules = match self.policy(resource, action) {
            Some(Policy::Rules(rules)) => rules,
            Some(Policy::Disabled) => return Decision::Deny(DenyReason::Disabled),
            None => return Decision::Deny(DenyReason::NotPermitted),
        };
        if action.phase() == Phase::Object && target.is_none() {
            return Decision::Deny(DenyReason::NotPermitted);
        }

        let eval = Evaluation { action, subject, target };
        for rule in rules {
            let failed = match *rule {
                Require(predicate) => (!predicate.holds(&eval)).then_some(predicate),
                AnyOf(group) => {
                    if group.iter().any(|p| p.holds(&eval)) {
                        None
                    } else {
                        group.last().copied()
                    }
                }
            };
            if let Some(predicate) = failed {
                let authenticated = subject.actor.is_some_and(|u| u.is_active);
                if !authenticated {
                    return Decision::Deny(DenyReason::Unauthenticated);
                }
                return Decision::Deny(DenyReason::Failed(predicate));
            }
        }
        Decision::Allow
    }

    /// Authorizes and converts a denial into the matching error.
    pub fn check(
        &self,
        resource: Resource,
        action: Action,
        subject: &Subject<'_>,
        target: Option<Target<'_>>,
    ) -> Result<(), ApiError> {
        let decision = self.authorize(resource, action, subject, target);
        if let Decision::Deny(reason) = decision {
            debug!(
                "Denied {} {} for user {:?}: {:?}",
                action,
                resource,
                subject.actor.map(|u| u.user_id),
                reason
            );
        }
        decision.into_result(resource, action)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContributorPermission, ContributorRole, IssuePriority, IssueStatus, ProjectType};
    use chrono::Utc;

    fn user(id: i64) -> User {
        User {
            user_id: id,
            first_name: "U".into(),
            last_name: id.to_string(),
            email: format!("u{}@example.com", id),
            password: "hash".into(),
            is_active: true,
        }
    }

    fn project(id: i64, owner: i64) -> Project {
        Project {
            project_id: id,
            title: "X".into(),
            description: String::new(),
            project_type: ProjectType::Application,
            author_user_id: owner,
        }
    }

    fn issue(project_id: i64, author: i64) -> Issue {
        Issue {
            issue_id: 10,
            title: "Crash".into(),
            desc: String::new(),
            tag: "BUG".into(),
            priority: IssuePriority::High,
            project_id,
            status: IssueStatus::New,
            author_user_id: author,
            assignee_user_id: author,
            time_created: Utc::now(),
        }
    }

    fn comment(issue_id: i64, author: i64) -> Comment {
        Comment {
            comment_id: 20,
            description: "seen".into(),
            author_user_id: author,
            issue_id,
            time_created: Utc::now(),
        }
    }

    fn membership(project_id: i64, user_id: i64) -> Contributor {
        Contributor {
            contributor_id: 30,
            user_id,
            project_id,
            permission: ContributorPermission::Read,
            role: ContributorRole::Developer,
        }
    }

    const OWNER_ID: i64 = 1;
    const MEMBER_ID: i64 = 2;
    const STRANGER_ID: i64 = 3;

    fn subject<'a>(actor: Option<&'a User>, project: &'a Project) -> Subject<'a> {
        Subject {
            actor,
            project: Some(project),
            is_contributor: actor.is_some_and(|u| u.user_id == MEMBER_ID),
        }
    }

    #[test]
    fn every_unlisted_pair_is_denied() {
        let table = PolicyTable::standard();
        let owner = user(OWNER_ID);
        let p = project(1, OWNER_ID);
        let s = subject(Some(&owner), &p);
        let c = membership(1, MEMBER_ID);
        let i = issue(1, OWNER_ID);

        for (resource, action, target) in [
            (Resource::Contributor, Action::Retrieve, Target::Contributor(&c)),
            (Resource::Contributor, Action::Update, Target::Contributor(&c)),
            (Resource::Contributor, Action::PartialUpdate, Target::Contributor(&c)),
            (Resource::Issue, Action::Retrieve, Target::Issue(&i)),
        ] {
            assert_eq!(
                table.authorize(resource, action, &s, Some(target)),
                Decision::Deny(DenyReason::NotPermitted),
                "{} {}",
                action,
                resource
            );
        }
    }

    #[test]
    fn partial_update_is_disabled() {
        let table = PolicyTable::standard();
        let owner = user(OWNER_ID);
        let p = project(1, OWNER_ID);
        let decision = table.authorize(
            Resource::Project,
            Action::PartialUpdate,
            &subject(Some(&owner), &p),
            Some(Target::Project(&p)),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::Disabled));
        assert!(matches!(
            decision.into_result(Resource::Project, Action::PartialUpdate),
            Err(ApiError::MethodNotSupported(_))
        ));
    }

    #[test]
    fn project_object_rules() {
        let table = PolicyTable::standard();
        let p = project(1, OWNER_ID);
        let (owner, member, stranger) = (user(OWNER_ID), user(MEMBER_ID), user(STRANGER_ID));
        let target = Some(Target::Project(&p));

        let retrieve = |u: &User| table.authorize(Resource::Project, Action::Retrieve, &subject(Some(u), &p), target);
        let update = |u: &User| table.authorize(Resource::Project, Action::Update, &subject(Some(u), &p), target);

        assert_eq!(retrieve(&owner), Decision::Allow);
        assert_eq!(retrieve(&member), Decision::Allow);
        assert_eq!(retrieve(&stranger), Decision::Deny(DenyReason::Failed(IsContributorOrOwner)));
        assert_eq!(update(&owner), Decision::Allow);
        assert_eq!(update(&member), Decision::Deny(DenyReason::Failed(IsOwner)));
    }

    #[test]
    fn project_list_and_create_need_only_authentication() {
        let table = PolicyTable::standard();
        let stranger = user(STRANGER_ID);
        let s = Subject { actor: Some(&stranger), project: None, is_contributor: false };
        assert_eq!(table.authorize(Resource::Project, Action::List, &s, None), Decision::Allow);
        assert_eq!(table.authorize(Resource::Project, Action::Create, &s, None), Decision::Allow);

        let anonymous = Subject { actor: None, project: None, is_contributor: false };
        assert_eq!(
            table.authorize(Resource::Project, Action::List, &anonymous, None),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn inactive_actor_counts_as_unauthenticated() {
        let table = PolicyTable::standard();
        let mut owner = user(OWNER_ID);
        owner.is_active = false;
        let p = project(1, OWNER_ID);
        assert_eq!(
            table.authorize(Resource::Project, Action::Update, &subject(Some(&owner), &p), Some(Target::Project(&p))),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn contributor_ownership_comes_from_the_project() {
        let table = PolicyTable::standard();
        let p = project(1, OWNER_ID);
        let c = membership(1, MEMBER_ID);
        let (owner, member) = (user(OWNER_ID), user(MEMBER_ID));

        assert_eq!(
            table.authorize(Resource::Contributor, Action::Destroy, &subject(Some(&owner), &p), Some(Target::Contributor(&c))),
            Decision::Allow
        );
        // a member may not remove itself
        assert_eq!(
            table.authorize(Resource::Contributor, Action::Destroy, &subject(Some(&member), &p), Some(Target::Contributor(&c))),
            Decision::Deny(DenyReason::Failed(IsOwner))
        );
        assert_eq!(
            table.authorize(Resource::Contributor, Action::Create, &subject(Some(&member), &p), None),
            Decision::Deny(DenyReason::Failed(IsOwner))
        );
        assert_eq!(
            table.authorize(Resource::Contributor, Action::List, &subject(Some(&member), &p), None),
            Decision::Allow
        );
    }

    #[test]
    fn issue_update_belongs_to_its_author_not_the_project_owner() {
        let table = PolicyTable::standard();
        let p = project(1, OWNER_ID);
        let i = issue(1, MEMBER_ID);
        let (owner, member) = (user(OWNER_ID), user(MEMBER_ID));

        assert_eq!(
            table.authorize(Resource::Issue, Action::Update, &subject(Some(&member), &p), Some(Target::Issue(&i))),
            Decision::Allow
        );
        assert_eq!(
            table.authorize(Resource::Issue, Action::Destroy, &subject(Some(&owner), &p), Some(Target::Issue(&i))),
            Decision::Deny(DenyReason::Failed(IsOwner))
        );
    }

    #[test]
    fn comment_scope_is_resolved_through_its_issue() {
        let table = PolicyTable::standard();
        let p = project(1, OWNER_ID);
        let other = project(2, OWNER_ID);
        let i = issue(1, OWNER_ID);
        let c = comment(i.issue_id, MEMBER_ID);
        let member = user(MEMBER_ID);

        assert_eq!(
            table.authorize(Resource::Comment, Action::Retrieve, &subject(Some(&member), &p), Some(Target::Comment(&c, &i))),
            Decision::Allow
        );
        // scope pointing at a different project than the comment's issue
        assert_eq!(
            table.authorize(Resource::Comment, Action::Retrieve, &subject(Some(&member), &other), Some(Target::Comment(&c, &i))),
            Decision::Deny(DenyReason::Failed(IsContributorOrOwner))
        );
    }

    #[test]
    fn object_actions_require_a_target() {
        let table = PolicyTable::standard();
        let owner = user(OWNER_ID);
        let p = project(1, OWNER_ID);
        assert_eq!(
            table.authorize(Resource::Project, Action::Destroy, &subject(Some(&owner), &p), None),
            Decision::Deny(DenyReason::NotPermitted)
        );
    }

    #[test]
    fn read_safe_tracks_the_action() {
        let p = project(1, OWNER_ID);
        let s = Subject { actor: None, project: Some(&p), is_contributor: false };
        let eval = |action| Evaluation { action, subject: &s, target: None };
        assert!(ReadSafe.holds(&eval(Action::List)));
        assert!(ReadSafe.holds(&eval(Action::Retrieve)));
        assert!(!ReadSafe.holds(&eval(Action::Create)));
        assert!(!ReadSafe.holds(&eval(Action::Destroy)));
    }

    #[test]
    fn custom_tables_can_relax_a_rule() {
        let table = PolicyTable::from_entries(&[(
            Resource::Issue,
            Action::Retrieve,
            Policy::Rules(&[Rule::AnyOf(&[Predicate::ReadSafe, Predicate::IsOwner])]),
        )]);
        let p = project(1, OWNER_ID);
        let i = issue(1, OWNER_ID);
        let stranger = user(STRANGER_ID);
        assert_eq!(
            table.authorize(Resource::Issue, Action::Retrieve, &subject(Some(&stranger), &p), Some(Target::Issue(&i))),
            Decision::Allow
        );
        assert_eq!(table.policy(Resource::Project, Action::List), None);
    }
}
