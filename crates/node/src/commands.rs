//! CLI commands

use iou_core::{Currency, Money};
use iou_ledger::{LinearId, PartySigner, Signer};
use rust_decimal::Decimal;

use crate::config::NodeConfig;
use crate::context::AppContext;
use crate::keys;

/// Issue a new IOU
pub async fn issue(
    ctx: &mut AppContext,
    lender: &str,
    borrower: &str,
    amount: Decimal,
    currency: &str,
) -> Result<(), anyhow::Error> {
    let currency: Currency = currency.parse()?;
    let amount = Money::new(amount, currency)?;

    let stx = ctx.issue(lender, borrower, amount).await?;
    let iou = stx
        .tx
        .iou_outputs()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Committed issue has no IOU output"))?;

    println!("✅ Issued {}", iou);
    println!("   Linear id: {}", iou.linear_id);
    println!("   Tx: {}", stx.id());
    Ok(())
}

/// Transfer the lender position of an IOU
pub async fn transfer(
    ctx: &mut AppContext,
    caller: &str,
    linear_id: &str,
    new_lender: &str,
) -> Result<(), anyhow::Error> {
    let linear_id: LinearId = linear_id.parse()?;

    let stx = ctx.transfer(caller, linear_id, new_lender).await?;
    let iou = stx
        .tx
        .iou_outputs()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Committed transfer has no IOU output"))?;

    println!("✅ Transferred {}", iou.linear_id);
    println!("   New lender: {}", iou.lender);
    println!("   Signed by {} parties", stx.signatures.len());
    println!("   Tx: {}", stx.id());
    Ok(())
}

/// List current IOUs, optionally only those a party participates in
pub async fn list(ctx: &AppContext, party: Option<&str>) -> Result<(), anyhow::Error> {
    let states = match party {
        Some(name) => ctx.states_of(name).await?,
        None => ctx.current_states(),
    };

    if states.is_empty() {
        println!("No current IOUs");
        return Ok(());
    }

    println!("📒 {} current IOU(s):", states.len());
    for s in states {
        println!(
            "   {}  {:>14}  lender={}  borrower={}",
            s.state.linear_id,
            s.state.amount.to_string(),
            s.state.lender.name,
            s.state.borrower.name
        );
    }
    Ok(())
}

/// Re-verify the journal
pub fn audit(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let report = ctx.audit()?;

    if report.is_clean() {
        println!("✅ Journal verified ({} transactions)", report.checked);
        return Ok(());
    }

    for failure in &report.failures {
        println!(
            "❌ seq {} ({}): {}",
            failure.sequence, failure.tx_id, failure.reason
        );
    }
    anyhow::bail!(
        "{} of {} transactions failed verification",
        report.failures.len(),
        report.checked
    )
}

/// Generate a key for a party
pub fn keygen(config: &NodeConfig, name: &str, force: bool) -> Result<(), anyhow::Error> {
    let path = keys::key_file(&config.keys_path(), name);
    if path.exists() && !force {
        anyhow::bail!("Key already exists at {} (use --force to replace)", path.display());
    }

    let signer = PartySigner::generate();
    let path = keys::write_key(&config.keys_path(), name, &signer)?;

    println!("✅ Generated key for {}", name.to_uppercase());
    println!("   Private key saved to: {}", path.display());
    println!("   Public key: {}", signer.public_key().to_hex());
    println!();
    println!("To use: export {}={}", keys::key_env_var(name), signer.seed_hex());
    Ok(())
}
