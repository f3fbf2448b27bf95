//! Route handlers. Each one parses input, calls the ledger service and
//! wraps the result; no business rules live here.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::response::ApiResponse;
use super::AppState;
use crate::accounts::{NewUser, User, UserStatus};
use crate::error::{LedgerError, Result};
use crate::ledger::{Transaction, TransactionFilter, TransactionSort, TransactionStatus, TransactionType};
use crate::service::BalanceView;
use crate::trading::{TradeOutcome, TradeRequest};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

fn body<T>(payload: Body<T>) -> Result<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| LedgerError::validation(e.body_text()))
}

fn user_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| LedgerError::validation(format!("invalid user id: {raw}")))
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: i64,
    pub amount: f64,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub user_id: i64,
    pub amount: f64,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub user_id: i64,
    pub transaction_id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub settlement_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub new_balance: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
}

impl TransactionsQuery {
    fn parse(&self) -> Result<(TransactionFilter, TransactionSort)> {
        let kind = self
            .kind
            .as_deref()
            .map(|k| {
                TransactionType::parse(k)
                    .ok_or_else(|| LedgerError::validation(format!("unknown transaction type: {k}")))
            })
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| {
                TransactionStatus::parse(s)
                    .ok_or_else(|| LedgerError::validation(format!("unknown status: {s}")))
            })
            .transpose()?;
        let sort = match self.sort.as_deref() {
            Some(s) => TransactionSort::parse(s)
                .ok_or_else(|| LedgerError::validation(format!("unknown sort: {s}")))?,
            None => TransactionSort::default(),
        };
        Ok((TransactionFilter { kind, status }, sort))
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub count: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub transaction_id: String,
    pub new_balance: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub kv: &'static str,
    pub version: &'static str,
}

// ===== Route Handlers =====

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let kv = if state.service.store_reachable().await {
        "reachable"
    } else {
        "unreachable"
    };
    Json(HealthResponse {
        status: "ok",
        kv,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn register_user(
    State(state): State<AppState>,
    payload: Body<NewUser>,
) -> Result<ApiResponse<User>> {
    let profile = body(payload)?;
    let user = state.service.register_user(profile).await?;
    Ok(ApiResponse::created(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<User>> {
    let id = user_id(&id)?;
    state
        .service
        .get_user(id)
        .await?
        .map(ApiResponse::ok)
        .ok_or(LedgerError::UserNotFound(id))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<BalanceView>> {
    let id = user_id(&id)?;
    Ok(ApiResponse::ok(state.service.get_balance(id).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TransactionsQuery>,
) -> Result<ApiResponse<TransactionsResponse>> {
    let id = user_id(&id)?;
    let (filter, sort) = params.parse()?;
    let transactions = state.service.list_transactions(id, &filter, sort).await?;
    Ok(ApiResponse::ok(TransactionsResponse {
        count: transactions.len(),
        transactions,
    }))
}

pub async fn submit_deposit(
    State(state): State<AppState>,
    payload: Body<DepositRequest>,
) -> Result<ApiResponse<Transaction>> {
    let req = body(payload)?;
    let tx = state
        .service
        .submit_deposit(req.user_id, req.amount, req.reference)
        .await?;
    Ok(ApiResponse::created(tx))
}

pub async fn submit_withdraw(
    State(state): State<AppState>,
    payload: Body<WithdrawRequest>,
) -> Result<ApiResponse<Transaction>> {
    let req = body(payload)?;
    let tx = state
        .service
        .submit_withdraw(req.user_id, req.amount, &req.address)
        .await?;
    Ok(ApiResponse::created(tx))
}

pub async fn execute_trade(
    State(state): State<AppState>,
    payload: Body<TradeRequest>,
) -> Result<ApiResponse<TradeOutcome>> {
    let req = body(payload)?;
    let outcome = state.service.execute_trade(&req).await?;
    Ok(ApiResponse::created(outcome))
}

// ===== Admin Handlers =====

pub async fn approve_deposit(
    State(state): State<AppState>,
    payload: Body<DecisionRequest>,
) -> Result<ApiResponse<ApprovalResponse>> {
    let req = body(payload)?;
    let new_balance = state
        .service
        .approve_deposit(req.user_id, &req.transaction_id)
        .await?;
    Ok(ApiResponse::ok(ApprovalResponse {
        transaction_id: req.transaction_id,
        new_balance,
    }))
}

pub async fn reject_deposit(
    State(state): State<AppState>,
    payload: Body<DecisionRequest>,
) -> Result<ApiResponse<Transaction>> {
    let req = body(payload)?;
    let tx = state
        .service
        .reject_deposit(req.user_id, &req.transaction_id, req.reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(tx))
}

pub async fn approve_withdraw(
    State(state): State<AppState>,
    payload: Body<DecisionRequest>,
) -> Result<ApiResponse<ApprovalResponse>> {
    let req = body(payload)?;
    let new_balance = state
        .service
        .approve_withdraw(req.user_id, &req.transaction_id)
        .await?;
    Ok(ApiResponse::ok(ApprovalResponse {
        transaction_id: req.transaction_id,
        new_balance,
    }))
}

pub async fn reject_withdraw(
    State(state): State<AppState>,
    payload: Body<DecisionRequest>,
) -> Result<ApiResponse<Transaction>> {
    let req = body(payload)?;
    let tx = state
        .service
        .reject_withdraw(req.user_id, &req.transaction_id, req.reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(tx))
}

pub async fn complete_withdraw(
    State(state): State<AppState>,
    payload: Body<DecisionRequest>,
) -> Result<ApiResponse<Transaction>> {
    let req = body(payload)?;
    let tx = state
        .service
        .complete_withdraw(req.user_id, &req.transaction_id, req.settlement_ref.as_deref())
        .await?;
    Ok(ApiResponse::ok(tx))
}

pub async fn adjust_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Body<AdjustRequest>,
) -> Result<ApiResponse<Transaction>> {
    let id = user_id(&id)?;
    let req = body(payload)?;
    let tx = state
        .service
        .adjust_balance(id, req.new_balance, req.reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(tx))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Body<StatusRequest>,
) -> Result<ApiResponse<User>> {
    let id = user_id(&id)?;
    let req = body(payload)?;
    let status = UserStatus::parse(&req.status)
        .ok_or_else(|| LedgerError::validation(format!("unknown user status: {}", req.status)))?;
    let user = state
        .service
        .set_user_status(id, status, req.reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing() {
        let q = TransactionsQuery {
            kind: Some("withdraw".into()),
            status: Some("PROCESSING".into()),
            sort: Some("amount-asc".into()),
        };
        let (filter, sort) = q.parse().unwrap();
        assert_eq!(filter.kind, Some(TransactionType::Withdraw));
        assert_eq!(filter.status, Some(TransactionStatus::Processing));
        assert_eq!(sort, TransactionSort::AmountAsc);

        let (filter, sort) = TransactionsQuery::default().parse().unwrap();
        assert_eq!(filter, TransactionFilter::default());
        assert_eq!(sort, TransactionSort::DateDesc);

        let q = TransactionsQuery {
            sort: Some("sideways".into()),
            ..Default::default()
        };
        assert!(q.parse().is_err());
    }

    #[test]
    fn test_user_id_parsing() {
        assert_eq!(user_id(" 42 ").unwrap(), 42);
        assert!(user_id("abc").is_err());
    }
}
