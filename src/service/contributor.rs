// src/service/contributor.rs

use log::info;

use super::RequestContext;
use crate::error::ApiError;
use crate::models::{Contributor, ContributorPayload, NewContributor, Project, ProjectId, UserId};
use crate::permissions::{Action, Resource, Target};

pub async fn list(ctx: &RequestContext<'_>, project_id: ProjectId) -> Result<Vec<Contributor>, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Contributor, Action::List, Some(&project), None)
        .await?;
    Ok(ctx.store.contributors_of(project_id).await?)
}

/// Adds a member. The uniqueness of (user, project) is left to the store so
/// two racing requests end with exactly one row.
pub async fn create(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    payload: ContributorPayload,
) -> Result<Contributor, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Contributor, Action::Create, Some(&project), None)
        .await?;

    if let Some(given) = payload.project_id {
        if given != project_id {
            return Err(ApiError::InvalidReference {
                given,
                expected: project_id,
            });
        }
    }
    if ctx.store.user_by_id(payload.user_id).await?.is_none() {
        return Err(ApiError::not_found("user", payload.user_id));
    }

    let contributor = ctx
        .store
        .insert_contributor(NewContributor {
            user_id: payload.user_id,
            project_id,
            permission: payload.permission,
            role: payload.role,
        })
        .await
        .map_err(|e| {
            ApiError::from_write(
                e,
                &format!(
                    "user {} is already a contributor to project {}",
                    payload.user_id, project_id
                ),
            )
        })?;
    info!("Added user {} to project {}", payload.user_id, project_id);
    Ok(contributor)
}

/// Resolves project, user and membership row in that order, each missing
/// one being NotFound.
async fn resolve(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    user_id: UserId,
) -> Result<(Project, Contributor), ApiError> {
    let project = ctx.project(project_id).await?;
    if ctx.store.user_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("user", user_id));
    }
    let contributor = ctx
        .store
        .contributor(project_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("the contributor does not exist".to_string()))?;
    Ok((project, contributor))
}

pub async fn retrieve(ctx: &RequestContext<'_>, project_id: ProjectId, user_id: UserId) -> Result<Contributor, ApiError> {
    let (project, contributor) = resolve(ctx, project_id, user_id).await?;
    ctx.authorize(
        Resource::Contributor,
        Action::Retrieve,
        Some(&project),
        Some(Target::Contributor(&contributor)),
    )
    .await?;
    Ok(contributor)
}

pub async fn delete(ctx: &RequestContext<'_>, project_id: ProjectId, user_id: UserId) -> Result<(), ApiError> {
    let (project, contributor) = resolve(ctx, project_id, user_id).await?;
    ctx.authorize(
        Resource::Contributor,
        Action::Destroy,
        Some(&project),
        Some(Target::Contributor(&contributor)),
    )
    .await?;
    if !ctx.store.delete_contributor(project_id, user_id).await? {
        return Err(ApiError::NotFound("the contributor does not exist".to_string()));
    }
    info!("Removed user {} from project {}", user_id, project_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;

    fn payload(user_id: UserId) -> ContributorPayload {
        serde_json::from_value(serde_json::json!({ "user_id": user_id, "role": "DEV" })).unwrap()
    }

    #[actix_web::test]
    async fn only_the_owner_adds_members() {
        let world = World::new();
        let (owner, member, other) = (world.user("Owner").await, world.user("Member").await, world.user("Other").await);
        let project = world.project(&owner, "X").await;
        world.add_contributor(&owner, &project, &member).await;

        let err = create(&world.as_user(&member), project.project_id, payload(other.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let added = create(&world.as_user(&owner), project.project_id, payload(other.user_id))
            .await
            .unwrap();
        assert_eq!(added.user_id, other.user_id);
        assert_eq!(added.project_id, project.project_id);
    }

    #[actix_web::test]
    async fn duplicate_membership_already_exists() {
        let world = World::new();
        let (owner, member) = (world.user("Owner").await, world.user("Member").await);
        let project = world.project(&owner, "X").await;
        world.add_contributor(&owner, &project, &member).await;

        let err = create(&world.as_user(&owner), project.project_id, payload(member.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyExists(_)));
    }

    #[actix_web::test]
    async fn concurrent_duplicates_yield_one_success() {
        let world = World::new();
        let (owner, member) = (world.user("Owner").await, world.user("Member").await);
        let project = world.project(&owner, "X").await;
        let ctx_a = world.as_user(&owner);
        let ctx_b = world.as_user(&owner);

        let (a, b) = tokio::join!(
            create(&ctx_a, project.project_id, payload(member.user_id)),
            create(&ctx_b, project.project_id, payload(member.user_id)),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(ApiError::AlreadyExists(_))))
                .count(),
            1
        );
        assert_eq!(list(&ctx_a, project.project_id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn body_project_must_match_path() {
        let world = World::new();
        let (owner, member) = (world.user("Owner").await, world.user("Member").await);
        let project = world.project(&owner, "X").await;
        let body = serde_json::from_value(serde_json::json!({
            "user_id": member.user_id,
            "project_id": project.project_id + 100,
        }))
        .unwrap();
        let err = create(&world.as_user(&owner), project.project_id, body).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidReference { .. }));
    }

    #[actix_web::test]
    async fn unknown_user_is_not_found() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let project = world.project(&owner, "X").await;
        let err = create(&world.as_user(&owner), project.project_id, payload(4242)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[actix_web::test]
    async fn members_list_but_cannot_remove_themselves() {
        let world = World::new();
        let (owner, member, stranger) = (world.user("Owner").await, world.user("Member").await, world.user("Stranger").await);
        let project = world.project(&owner, "X").await;
        world.add_contributor(&owner, &project, &member).await;

        assert_eq!(list(&world.as_user(&member), project.project_id).await.unwrap().len(), 1);
        assert!(matches!(
            list(&world.as_user(&stranger), project.project_id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            delete(&world.as_user(&member), project.project_id, member.user_id).await,
            Err(ApiError::Forbidden(_))
        ));
        delete(&world.as_user(&owner), project.project_id, member.user_id).await.unwrap();
        assert!(matches!(
            delete(&world.as_user(&owner), project.project_id, member.user_id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn retrieve_resolves_then_denies() {
        let world = World::new();
        let (owner, member) = (world.user("Owner").await, world.user("Member").await);
        let project = world.project(&owner, "X").await;
        assert!(matches!(
            retrieve(&world.as_user(&owner), project.project_id, member.user_id).await,
            Err(ApiError::NotFound(_))
        ));
        world.add_contributor(&owner, &project, &member).await;
        assert!(matches!(
            retrieve(&world.as_user(&owner), project.project_id, member.user_id).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
