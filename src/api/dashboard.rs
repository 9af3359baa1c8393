//! Back-office dashboard aggregates

use crate::billing::status::{BillType, Status};
use crate::core::error::AppError;
use crate::core::extractors::CurrentUser;
use crate::core::money::Money;
use crate::core::query::{Query, SortDirection};
use crate::entities::bill::{Bill, Installment};
use crate::entities::quotation::QuotationStatus;
use crate::server::host::AppState;
use axum::{Json, extract::State};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Installments due within this many days are listed as upcoming
const UPCOMING_WINDOW_DAYS: i64 = 30;
const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingInstallment {
    pub bill_id: Uuid,
    pub installment_id: Uuid,
    pub installment_number: u32,
    pub bill_type: BillType,
    pub due_date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub clients: usize,
    pub bills: usize,
    /// Bill count per status
    pub bills_by_status: BTreeMap<String, usize>,
    pub receivable_outstanding: Money,
    pub payable_outstanding: Money,
    pub overdue_installments: usize,
    pub overdue_amount: Money,
    /// Paid since the first day of the current month
    pub received_this_month: Money,
    pub open_quotations: usize,
    pub quote_requests: usize,
    pub upcoming: Vec<UpcomingInstallment>,
}

impl Dashboard {
    /// Billing figures from bills and their installments as of `today`
    pub fn compute(today: NaiveDate, bills: &[Bill], installments: &[Installment]) -> Self {
        let mut dashboard = Dashboard {
            bills: bills.len(),
            ..Default::default()
        };
        for status in Status::ALL {
            dashboard.bills_by_status.insert(status.to_string(), 0);
        }
        for bill in bills {
            *dashboard
                .bills_by_status
                .entry(bill.status.to_string())
                .or_default() += 1;
        }

        let bill_types: HashMap<Uuid, BillType> =
            bills.iter().map(|b| (b.id, b.bill_type)).collect();
        let month_start = today.with_day(1).unwrap_or(today);
        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);

        for installment in installments {
            let Some(&bill_type) = bill_types.get(&installment.bill_id) else {
                continue;
            };
            if installment.status.is_open() {
                match bill_type {
                    BillType::Receivable => dashboard.receivable_outstanding += installment.amount,
                    BillType::Payable => dashboard.payable_outstanding += installment.amount,
                }
            }
            if installment.status == Status::Overdue {
                dashboard.overdue_installments += 1;
                dashboard.overdue_amount += installment.amount;
            }
            if installment.status == Status::Paid
                && bill_type == BillType::Receivable
                && installment.paid_date.is_some_and(|d| d >= month_start)
            {
                dashboard.received_this_month += installment.amount;
            }
            if installment.status == Status::Pending
                && installment.due_date >= today
                && installment.due_date <= horizon
            {
                dashboard.upcoming.push(UpcomingInstallment {
                    bill_id: installment.bill_id,
                    installment_id: installment.id,
                    installment_number: installment.installment_number,
                    bill_type,
                    due_date: installment.due_date,
                    amount: installment.amount,
                });
            }
        }

        dashboard
            .upcoming
            .sort_by_key(|u| (u.due_date, u.installment_number));
        dashboard.upcoming.truncate(UPCOMING_LIMIT);
        dashboard
    }
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    let tables = &state.tables;
    let open_quotations = Query::new().is_in(
        "status",
        &[
            QuotationStatus::Requested,
            QuotationStatus::Draft,
            QuotationStatus::Sent,
        ],
    );
    let requested = Query::new().eq("status", QuotationStatus::Requested);
    let all_clients = Query::new();
    let all_bills = Query::new().order_by("created_at", SortDirection::Desc);
    let all_installments = Query::new().order_by("due_date", SortDirection::Asc);

    let (clients, bills, installments, open, requests) = futures::try_join!(
        tables.clients.count(&all_clients),
        tables.bills.list_all(&all_bills),
        tables.installments.list_all(&all_installments),
        tables.quotations.count(&open_quotations),
        tables.quotations.count(&requested),
    )?;

    let mut dashboard = Dashboard::compute(Utc::now().date_naive(), &bills, &installments);
    dashboard.clients = clients;
    dashboard.open_quotations = open;
    dashboard.quote_requests = requests;
    Ok(Json(dashboard))
}
