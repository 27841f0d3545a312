use async_trait::async_trait;

#[async_trait]
pub trait BranchResolver: Send + Sync {
    /// Returns the current branch. Never fails, resolvers fall back to
    /// `DEFAULT_BRANCH` instead.
    async fn current_branch(&self) -> String;
}
