//! Credit-ledger integration shim. All writes to `accounts` balance
//! columns go through here; the auction core never touches the fields
//! directly. Debit is a single guarded UPDATE so the balance check and
//! the decrement cannot be split by a concurrent debit from another
//! auction.

use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use crate::db::models::Account;
use crate::error::Result;

/// Outcome of an atomic debit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Ok,
    InsufficientFunds,
    NoAccount,
}

/// Debit `amount` from the account iff the balance covers it.
/// Balance-check-then-decrement happens in one statement.
pub async fn debit(conn: &mut SqliteConnection, account_id: i64, amount: i64) -> Result<DebitOutcome> {
    let result = sqlx::query(
        "UPDATE accounts SET credit_balance = credit_balance - ? WHERE id = ? AND credit_balance >= ?",
    )
    .bind(amount)
    .bind(account_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(DebitOutcome::Ok);
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(conn)
        .await?;
    Ok(if exists.is_some() {
        DebitOutcome::InsufficientFunds
    } else {
        DebitOutcome::NoAccount
    })
}

/// Unconditionally credit an account.
pub async fn credit(conn: &mut SqliteConnection, account_id: i64, amount: i64) -> Result<()> {
    sqlx::query("UPDATE accounts SET credit_balance = credit_balance + ? WHERE id = ?")
        .bind(amount)
        .bind(account_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn balance(pool: &SqlitePool, account_id: i64) -> Result<Option<i64>> {
    let bal: Option<i64> = sqlx::query_scalar("SELECT credit_balance FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(bal)
}

/// Bump the buyer-side counters after a successful debit.
pub async fn record_win(conn: &mut SqliteConnection, account_id: i64, amount: i64) -> Result<()> {
    sqlx::query(
        "UPDATE accounts SET total_spent = total_spent + ?, auctions_won = auctions_won + 1 WHERE id = ?",
    )
    .bind(amount)
    .bind(account_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Bump the submitter-side running total alongside an earnings row.
pub async fn record_earning(conn: &mut SqliteConnection, account_id: i64, amount: i64) -> Result<()> {
    sqlx::query(
        "UPDATE accounts SET credit_balance = credit_balance + ?, total_earned = total_earned + ? WHERE id = ?",
    )
    .bind(amount)
    .bind(amount)
    .bind(account_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Resolve a ledger principal by phone identity.
pub async fn account_by_phone(
    conn: &mut SqliteConnection,
    phone: &str,
) -> Result<Option<Account>> {
    let acct = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE phone = ?")
        .bind(phone)
        .fetch_optional(conn)
        .await?;
    Ok(acct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::testing;

    #[tokio::test]
    async fn debit_requires_sufficient_balance() {
        let pool = testing::pool().await;
        let id = testing::create_account(&pool, "34600111222", 1000).await;

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(debit(&mut conn, id, 1500).await.unwrap(), DebitOutcome::InsufficientFunds);
        assert_eq!(debit(&mut conn, id, 1000).await.unwrap(), DebitOutcome::Ok);
        drop(conn);

        assert_eq!(balance(&pool, id).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn debit_unknown_account_reports_no_account() {
        let pool = testing::pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(debit(&mut conn, 999, 100).await.unwrap(), DebitOutcome::NoAccount);
    }

    #[tokio::test]
    async fn credit_then_balance_roundtrip() {
        let pool = testing::pool().await;
        let id = testing::create_account(&pool, "34600111333", 0).await;

        let mut conn = pool.acquire().await.unwrap();
        credit(&mut conn, id, 2500).await.unwrap();
        drop(conn);

        assert_eq!(balance(&pool, id).await.unwrap(), Some(2500));
    }
}
