//! One month of a small furniture workshop: capital, a work order, a sale,
//! month-end reports, and the January close

use manufacturing_ledger::utils::{init_tracing, MemoryStorage};
use manufacturing_ledger::{
    patterns, Actor, JournalLineInput, Ledger, Role, TransactionBuilder, WorkOrderItem,
    WorkOrderStatus,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

fn line(code: &str, debit: i64, credit: i64) -> JournalLineInput {
    JournalLineInput {
        account_code: code.to_string(),
        debit: BigDecimal::from(debit),
        credit: BigDecimal::from(credit),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let ledger = Ledger::new(MemoryStorage::new());
    let accounts = ledger.setup_standard_chart_of_accounts().await?;
    println!("Chart of accounts: {} accounts", accounts.len());

    let jan = |day: u32| NaiveDate::from_ymd_opt(2024, 1, day).ok_or("invalid date");

    // 1. Capital and raw materials
    let investment = patterns::create_owner_investment(
        jan(2)?,
        "Setoran modal".to_string(),
        "1110".to_string(),
        "3100".to_string(),
        BigDecimal::from(20_000_000),
    )?;
    ledger.record_transaction(investment).await?;

    let purchase = TransactionBuilder::new(jan(3)?, "Pembelian kayu jati".to_string())
        .reference("PO-0001".to_string())
        .debit("1140".to_string(), BigDecimal::from(4_000_000), None)
        .credit("2110".to_string(), BigDecimal::from(4_000_000), None)
        .build()?;
    ledger.record_transaction(purchase).await?;

    // 2. A work order for ten cabinets
    let work_order = ledger
        .create_work_order(
            "WO-2024-001".to_string(),
            vec![WorkOrderItem::new(
                "Lemari jati".to_string(),
                BigDecimal::from(450_000),
                BigDecimal::from(10),
            )],
        )
        .await?;

    ledger
        .issue_material(
            &work_order.id,
            jan(8)?,
            "Kayu untuk WO-2024-001".to_string(),
            vec![line("1150", 3_200_000, 0), line("1140", 0, 3_200_000)],
        )
        .await?;
    ledger
        .upsert_work_order_cost(
            &work_order.id,
            BigDecimal::from(400_000),
            BigDecimal::from(900_000),
        )
        .await?;

    for status in [
        WorkOrderStatus::PendingInventory,
        WorkOrderStatus::TungguAntrian,
        WorkOrderStatus::Proses,
        WorkOrderStatus::Qc,
    ] {
        ledger.transition_work_order(&work_order.id, status).await?;
    }
    ledger.finalize_work_order_cost(&work_order.id).await?;

    let summary = ledger.get_work_order_cost_summary(&work_order.id).await?;
    println!(
        "{}: standard {} / COGM {} / variance {}",
        work_order.number, summary.standard_cost, summary.actual_cogm, summary.variance
    );

    // 3. Apply overhead and labor, move the goods to finished stock, sell them
    ledger
        .post_transaction(
            jan(18)?,
            "Pembebanan overhead dan upah WO-2024-001".to_string(),
            vec![
                line("1150", 1_300_000, 0),
                line("2120", 0, 900_000),
                line("2110", 0, 400_000),
            ],
        )
        .await?;
    ledger
        .post_transaction(
            jan(19)?,
            "Barang jadi WO-2024-001".to_string(),
            vec![line("1160", 4_500_000, 0), line("1150", 0, 4_500_000)],
        )
        .await?;
    ledger
        .post_transaction(
            jan(20)?,
            "Penjualan 10 lemari".to_string(),
            vec![line("1130", 7_500_000, 0), line("4100", 0, 7_500_000)],
        )
        .await?;
    ledger
        .post_transaction(
            jan(20)?,
            "HPP 10 lemari".to_string(),
            vec![line("5100", 4_500_000, 0), line("1160", 0, 4_500_000)],
        )
        .await?;
    let wages = patterns::create_expense_payment(
        jan(31)?,
        "Gaji administrasi".to_string(),
        "6100".to_string(),
        "1110".to_string(),
        BigDecimal::from(1_250_000),
    )?;
    ledger.record_transaction(wages).await?;

    // 4. Month-end reports
    let report = ledger.get_financial_report(jan(1)?, jan(31)?).await;
    let pnl = &report.profit_loss;
    println!("Laba Rugi Januari 2024");
    println!("  Pendapatan         {}", pnl.pendapatan);
    println!("  HPP                {}", pnl.hpp);
    println!("  Laba kotor         {}", pnl.laba_kotor);
    println!("  Beban operasional  {}", pnl.beban_operasional);
    println!("  Laba bersih        {}", pnl.laba_bersih);

    let sheet = &report.balance_sheet;
    println!("Neraca per {}", sheet.as_of_date);
    for row in &sheet.aset {
        println!("  {} {:<24} {}", row.account_code, row.account_name, row.amount);
    }
    println!(
        "  Total aset {}, kewajiban {}, ekuitas {}",
        sheet.total_aset, sheet.total_kewajiban, sheet.total_ekuitas
    );
    println!("  Seimbang: {}", if sheet.is_balanced { "ya" } else { "tidak" });

    let book = ledger
        .get_cash_bank_book(&accounts["kas"].id, jan(1)?, jan(31)?)
        .await?;
    println!(
        "Buku kas: {} baris, saldo akhir {}",
        book.rows.len(),
        book.closing_balance
    );

    // 5. Close January
    let accountant = Actor::new("dewi", vec![Role::Accountant]);
    let period = ledger.close_book(&accountant, jan(31)?, "Januari 2024").await?;
    println!(
        "Closed {} ({} to {}), net income {}",
        period.name, period.start_date, period.end_date, period.net_income
    );

    let integrity = ledger.validate_integrity(jan(31)?).await?;
    println!("Integrity: {}", if integrity.is_valid { "ok" } else { "issues found" });
    for issue in &integrity.issues {
        println!("  - {}", issue);
    }

    Ok(())
}
