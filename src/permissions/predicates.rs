// src/permissions/predicates.rs

use std::fmt;

use super::{Action, Subject, Target};
use crate::models::{ProjectId, UserId};

/// The building blocks every policy is composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// A verified actor whose account is active.
    IsAuthenticated,
    /// The actor authored the target. A contributor row has no author, so
    /// for it (and for collection checks) the project owner stands in.
    IsOwner,
    /// The actor owns or contributes to the project the target lives in.
    IsContributorOrOwner,
    /// The action only reads.
    ReadSafe,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Predicate::IsAuthenticated => "authentication required",
            Predicate::IsOwner => "only the owner may perform this action",
            Predicate::IsContributorOrOwner => "only the project owner or its contributors may perform this action",
            Predicate::ReadSafe => "only read access is allowed",
        };
        f.write_str(text)
    }
}

/// Everything a predicate may look at.
pub struct Evaluation<'a, 'b> {
    pub action: Action,
    pub subject: &'b Subject<'a>,
    pub target: Option<Target<'a>>,
}

impl Evaluation<'_, '_> {
    fn active_actor(&self) -> Option<UserId> {
        self.subject
            .actor
            .filter(|user| user.is_active)
            .map(|user| user.user_id)
    }

    /// Whether the project in scope is the one the target belongs to. A
    /// mismatch means the caller resolved the wrong project.
    fn scope_matches_target(&self) -> bool {
        let scope = match self.subject.project {
            Some(project) => project.project_id,
            None => return false,
        };
        match self.target.map(|t| t.project_id()) {
            Some(owner_project) => owner_project == scope,
            None => true,
        }
    }
}

impl<'a> Target<'a> {
    /// Project the target hangs off: itself, its `project`, or for a
    /// comment its issue's `project`.
    pub fn project_id(&self) -> ProjectId {
        match self {
            Target::Project(project) => project.project_id,
            Target::Contributor(contributor) => contributor.project_id,
            Target::Issue(issue) => issue.project_id,
            Target::Comment(_, issue) => issue.project_id,
        }
    }

    fn author(&self) -> Option<UserId> {
        match self {
            Target::Project(project) => Some(project.author_user_id),
            Target::Contributor(_) => None,
            Target::Issue(issue) => Some(issue.author_user_id),
            Target::Comment(comment, _) => Some(comment.author_user_id),
        }
    }
}

impl Predicate {
    pub fn holds(self, eval: &Evaluation<'_, '_>) -> bool {
        match self {
            Predicate::IsAuthenticated => eval.active_actor().is_some(),
            Predicate::IsOwner => {
                let Some(actor) = eval.active_actor() else {
                    return false;
                };
                match eval.target.and_then(|t| t.author()) {
                    Some(author) => author == actor,
                    None => {
                        eval.scope_matches_target()
                            && eval
                                .subject
                                .project
                                .is_some_and(|p| p.author_user_id == actor)
                    }
                }
            }
            Predicate::IsContributorOrOwner => {
                let Some(actor) = eval.active_actor() else {
                    return false;
                };
                if !eval.scope_matches_target() {
                    return false;
                }
                eval.subject
                    .project
                    .is_some_and(|p| p.author_user_id == actor)
                    || eval.subject.is_contributor
            }
            Predicate::ReadSafe => eval.action.is_read_only(),
        }
    }
}
