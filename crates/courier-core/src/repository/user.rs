//! User repository trait definition.

use courier_types::error::RepositoryError;
use courier_types::ids::TelegramUserId;
use courier_types::user::{KeyboardType, User, UserPatch, UserRole, UserStats};
use uuid::Uuid;

/// Repository trait for user persistence.
///
/// Implementations live in courier-infra (e.g., SqliteUserRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait UserRepository: Send + Sync {
    /// Look a user up by platform account id.
    fn find_by_telegram_id(
        &self,
        telegram_id: TelegramUserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Create the user if unknown, otherwise merge the patch into the
    /// existing record (only `Some` fields overwrite). Returns the stored
    /// record either way.
    fn upsert(
        &self,
        telegram_id: TelegramUserId,
        patch: UserPatch,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Change a user's role.
    fn set_role(
        &self,
        telegram_id: TelegramUserId,
        role: UserRole,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist the menu presentation preference.
    fn set_keyboard_type(
        &self,
        telegram_id: TelegramUserId,
        keyboard_type: KeyboardType,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All users, newest first.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// VIP-flagged users only.
    fn list_vip(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Record one visit for the statistics counters.
    fn record_visit(
        &self,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Aggregate user-base statistics.
    fn stats(
        &self,
    ) -> impl std::future::Future<Output = Result<UserStats, RepositoryError>> + Send;
}
