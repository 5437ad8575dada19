//! `shopvault card`: tokenized payment cards and sandbox charges.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{
    confirm, copy_to_clipboard, env_or_prompt_secret, open_store, CardAction, Cli, TerminalPrompt,
    CARD_NUMBER_ENV,
};
use crate::errors::{Result, VaultError};
use crate::gateway::{self, ChargeStatus, SandboxProcessor};
use crate::vault::RecordKind;

/// Execute a `card` subcommand.
pub fn execute(cli: &Cli, action: &CardAction) -> Result<()> {
    match action {
        CardAction::Add { exp } => add(cli, exp),
        CardAction::List => list(cli),
        CardAction::Show { token, copy } => show(cli, token, *copy),
        CardAction::Delete { token, force } => delete(cli, token, *force),
        CardAction::Charge { token, amount } => charge(cli, token, amount),
    }
}

fn add(cli: &Cli, exp: &str) -> Result<()> {
    let number: Zeroizing<String> = env_or_prompt_secret(CARD_NUMBER_ENV, "Card number")?;

    let (mut store, _) = open_store(cli)?;
    let card = gateway::tokenize_card(&mut store, &mut TerminalPrompt, &number, exp)?;

    output::success(&format!("{} {} tokenized", card.brand, card.mask));
    println!("{}", card.token);
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    let cards = gateway::list_cards(&mut store, &mut TerminalPrompt)?;
    output::info(&format!("{} card(s)", cards.len()));
    output::print_records_table(RecordKind::PaymentCard, &cards);
    Ok(())
}

fn show(cli: &Cli, token: &str, copy: bool) -> Result<()> {
    let (mut store, settings) = open_store(cli)?;
    let card = gateway::reveal_card(&mut store, &mut TerminalPrompt, token)?;

    if copy {
        copy_to_clipboard(&store, &settings, &card.number)?;
    } else {
        println!("{} {}", card.number.as_str(), card.exp);
    }
    Ok(())
}

fn delete(cli: &Cli, token: &str, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete card '{token}'?"))? {
        return Err(VaultError::Cancelled);
    }

    let (mut store, _) = open_store(cli)?;
    let removed = gateway::delete_card(&mut store, &mut TerminalPrompt, token)?;
    output::success(&format!("{} {} deleted", removed.brand, removed.mask));
    Ok(())
}

fn charge(cli: &Cli, token: &str, amount: &str) -> Result<()> {
    let cents = gateway::parse_amount(amount)?;

    let (mut store, _) = open_store(cli)?;
    let receipt = gateway::simulate_charge(&mut store, &mut TerminalPrompt, token, cents, &mut SandboxProcessor)?;

    output::print_receipt(&receipt);
    match receipt.status {
        ChargeStatus::Approved => output::success("Sandbox charge approved"),
        ChargeStatus::Declined => output::warning("Sandbox charge declined"),
    }
    Ok(())
}
