// Record subcommands

use std::io::{self, Write};
use std::path::Path;

use lahimena_config::Settings;
use lahimena_io::{backup, CellValue, FieldMap};
use lahimena_store::rates::FixedRates;
use lahimena_store::{
    grand_total, Client, ClientFilter, Currency, Entity, ExchangeRates, GroupBy, HotelFilter, Quotation,
    QuotationFilter, RateService, SheetStore, Stores,
};
use serde::Serialize;

use crate::CliError;

/// Parse repeated `FIELD=VALUE` arguments. Values are stored as text and
/// coerced by the record's field types.
pub fn parse_assignments(pairs: &[String]) -> Result<FieldMap, CliError> {
    let mut fields = FieldMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::args(format!("invalid assignment '{}'", pair))
                .with_hint("use --set FIELD=VALUE, e.g. --set nom=Rakoto"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::args(format!("missing field name in '{}'", pair)));
        }
        fields.insert(key.to_string(), CellValue::Text(value.trim().to_string()));
    }
    Ok(fields)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::general(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn write_line(out: &mut impl Write, line: std::fmt::Arguments<'_>) -> Result<(), CliError> {
    writeln!(out, "{}", line).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// generic add / update / delete
// ============================================================================

pub fn cmd_add<E: Entity>(store: &SheetStore<E>, set: &[String]) -> Result<(), CliError> {
    let record = E::from_fields(&parse_assignments(set)?);
    if record.key().is_empty() {
        return Err(CliError::args(format!("{} record needs a value for '{}'", E::KIND, E::key_field().name))
            .with_hint(format!("add --set {}=...", E::key_field().name)));
    }
    let row = store.append(&record)?;
    println!("{} '{}' written to row {}", E::KIND, record.key(), row);
    Ok(())
}

/// Apply assignments on top of the record currently at `row`
pub fn cmd_update<E: Entity>(store: &SheetStore<E>, row: usize, set: &[String]) -> Result<(), CliError> {
    let changes = parse_assignments(set)?;
    let Some(current) = store.get_by_row(row)? else {
        return Err(not_found(store, row));
    };

    let record = E::from_fields(&merge_changes::<E>(current.to_fields(), changes));

    if !store.update_by_row(row, &record)? {
        return Err(not_found(store, row));
    }
    println!("{} row {} updated", E::KIND, row);
    Ok(())
}

/// Overlay `changes` on a record's fields. A change given under a header
/// or alias replaces the field it names, so an empty value clears it.
fn merge_changes<E: Entity>(mut fields: FieldMap, changes: FieldMap) -> FieldMap {
    let extension = E::extension();
    for (key, value) in changes {
        let spec = E::fields()
            .iter()
            .chain(extension.map(|ext| ext.fields).unwrap_or_default())
            .find(|spec| spec.claims(&key));
        let name = spec.map_or(key, |spec| spec.name.to_string());
        fields.insert(name, value);
    }
    fields
}

pub fn cmd_delete<E: Entity>(store: &SheetStore<E>, row: usize) -> Result<(), CliError> {
    if !store.delete_by_row(row)? {
        return Err(not_found(store, row));
    }
    println!("{} row {} deleted", E::KIND, row);
    Ok(())
}

fn not_found<E: Entity>(store: &SheetStore<E>, row: usize) -> CliError {
    CliError::not_found(format!("no {} record at row {} of '{}'", E::KIND, row, store.sheet_name()))
        .with_hint(format!("run `lahimena {} list` to see row numbers", E::KIND))
}

// ============================================================================
// clients
// ============================================================================

pub fn cmd_clients_list(stores: &Stores, type_client: Option<String>, json: bool) -> Result<(), CliError> {
    let filter = ClientFilter { type_client };
    let clients = stores.clients.load_all(Some(&filter).filter(|f| f.type_client.is_some()))?;
    if json {
        return print_json(&clients);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for c in &clients {
        write_line(
            &mut out,
            format_args!("{:>4}  {:<12} {:<28} {:<10} {}", c.row_number, c.ref_client, c.display_name(), c.type_client, c.periode),
        )?;
    }
    Ok(())
}

pub fn cmd_clients_show(stores: &Stores, reference: &str, json: bool) -> Result<(), CliError> {
    let Some(client) = stores.clients.find_by_key(reference)? else {
        return Err(CliError::not_found(format!("no client with reference '{}'", reference)));
    };
    if json {
        return print_json(&client);
    }
    print_client(&client);
    Ok(())
}

fn print_client(c: &Client) {
    println!("Row:          {}", c.row_number);
    println!("Reference:    {}", c.ref_client);
    println!("Name:         {}", c.display_name());
    println!("Type:         {}", c.type_client);
    println!("Phone:        {}", c.telephone);
    println!("Email:        {}", c.email);
    println!("Period:       {}", c.periode);
    println!("Stay:         {} -> {} ({})", c.date_arrivee, c.date_depart, c.duree_sejour);
    println!(
        "Travellers:   {} adults, {} children, {} infants",
        c.nombre_adultes, c.nombre_enfants_2_12, c.nombre_bebes_0_2
    );
    let r = &c.rooming;
    println!("Rooms:        SGL {} / DBL {} / TWN {} / TPL {} / FML {}", r.sgl, r.dbl, r.twn, r.tpl, r.fml);
    for (name, value) in &c.extra {
        println!("{:<13} {}", format!("{}:", name), value);
    }
}

// ============================================================================
// hotels
// ============================================================================

pub fn cmd_hotels_list(
    stores: &Stores,
    city: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let filter = HotelFilter { city, category };
    let filtered = filter.city.is_some() || filter.category.is_some();
    let hotels = stores.hotels.load_all(Some(&filter).filter(|_| filtered))?;
    if json {
        return print_json(&hotels);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for h in &hotels {
        write_line(
            &mut out,
            format_args!(
                "{:>4}  {:<16} {:<28} {:<6} DBL {:>10} {}",
                h.row_number,
                h.lieu,
                h.nom,
                h.categorie,
                CellValue::Float(h.chambre_double),
                h.unite
            ),
        )?;
    }
    Ok(())
}

pub fn cmd_hotels_cities(stores: &Stores) -> Result<(), CliError> {
    for city in stores.hotels.cities()? {
        println!("{}", city);
    }
    Ok(())
}

// ============================================================================
// quotations
// ============================================================================

pub fn cmd_quotes_list(stores: &Stores, client: Option<String>, json: bool) -> Result<(), CliError> {
    let filter = QuotationFilter { client_ref: client, city: None };
    let quotes = stores.quotations.load_all(Some(&filter).filter(|f| f.client_ref.is_some()))?;
    if json {
        return print_json(&quotes);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for q in &quotes {
        write_line(
            &mut out,
            format_args!(
                "{:>4}  {:<27} {:<10} {:<20} {:>12} {}",
                q.row_number,
                q.numero,
                q.client_ref,
                q.hotel_name,
                CellValue::Float(q.total_price),
                q.currency_or_default()
            ),
        )?;
    }
    Ok(())
}

pub fn cmd_quotes_add(stores: &Stores, set: &[String]) -> Result<(), CliError> {
    let mut quotation = Quotation::from_fields(&parse_assignments(set)?);
    if quotation.numero.is_empty() {
        quotation.numero = Quotation::next_number();
    }
    if quotation.date.is_empty() {
        quotation.date = chrono::Local::now().format("%d/%m/%Y").to_string();
    }
    // Client name from the client sheet when only the reference was given
    if quotation.client_name.is_empty() && !quotation.client_ref.is_empty() {
        if let Some(client) = stores.clients.find_by_key(&quotation.client_ref)? {
            quotation.client_name = client.display_name();
        }
    }

    let row = stores.quotations.append(&quotation)?;
    println!("quotation '{}' written to row {}", quotation.numero, row);
    Ok(())
}

#[derive(Serialize)]
struct SummaryView<'a> {
    by: GroupBy,
    groups: Vec<&'a lahimena_store::QuotationGroup>,
    grand_total: f64,
}

pub fn cmd_quotes_summary(stores: &Stores, by: GroupBy, json: bool) -> Result<(), CliError> {
    let groups = stores.quotations.grouped(by, None)?;
    let total = grand_total(&groups);

    if json {
        return print_json(&SummaryView { by, groups: groups.values().collect(), grand_total: total });
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for group in groups.values() {
        write_line(
            &mut out,
            format_args!(
                "{:<30} {:>3} quote(s) {:>14} {}",
                group.label,
                group.quotations.len(),
                CellValue::Float(group.total),
                group.currency
            ),
        )?;
    }
    write_line(&mut out, format_args!("{:<30} {:>24}", "TOTAL", CellValue::Float(total)))
}

// ============================================================================
// rates
// ============================================================================

#[derive(Serialize)]
struct RatesView {
    rates: ExchangeRates,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversion: Option<ConversionView>,
}

#[derive(Serialize)]
struct ConversionView {
    amount: f64,
    from: Currency,
    to: Currency,
    result: f64,
}

fn parse_currency(value: &str) -> Result<Currency, CliError> {
    value
        .parse::<Currency>()
        .map_err(|e| CliError::args(e).with_hint("use Ariary, Euro or \"Dollar US\""))
}

pub fn cmd_rates(
    settings: &Settings,
    amount: Option<f64>,
    from: Option<String>,
    to: Option<String>,
    offline: bool,
    json: bool,
) -> Result<(), CliError> {
    let service = if offline {
        let fallback = ExchangeRates::from_settings(&settings.rates);
        RateService::new(Box::new(FixedRates(fallback)), fallback, settings.rate_ttl())
    } else {
        RateService::from_settings(&settings.rates, settings.rate_ttl())
    };
    let rates = service.rates();

    let conversion = match (amount, from, to) {
        (Some(amount), Some(from), Some(to)) => {
            let from = parse_currency(&from)?;
            let to = parse_currency(&to)?;
            Some(ConversionView { amount, from, to, result: service.convert(amount, from, to) })
        }
        _ => None,
    };

    if json {
        return print_json(&RatesView { rates, conversion });
    }

    println!("1 Euro      = {:.2} Ariary", rates.eur);
    println!("1 Dollar US = {:.2} Ariary", rates.usd);
    if let Some(c) = conversion {
        println!("{:.2} {} = {:.2} {}", c.amount, c.from, c.result, c.to);
    }
    Ok(())
}

// ============================================================================
// backups / config
// ============================================================================

pub fn cmd_backups(settings: &Settings, workbook: &str) -> Result<(), CliError> {
    let path = match workbook {
        "clients" | "quotes" | "quotations" => settings.client_workbook_path(),
        "hotels" => settings.hotel_workbook_path(),
        other => {
            return Err(CliError::args(format!("unknown workbook '{}'", other))
                .with_hint("expected clients or hotels"));
        }
    };
    let backups = backup::list_backups(&path);
    if backups.is_empty() {
        eprintln!("no backups of {}", path.display());
    }
    for b in backups {
        println!("{}", b.display());
    }
    Ok(())
}

pub fn cmd_config(settings: &Settings, config: Option<&Path>, init: bool) -> Result<(), CliError> {
    let path = config.map(Path::to_path_buf).unwrap_or_else(Settings::config_path);
    if init {
        settings.save_to(&path).map_err(CliError::io)?;
        eprintln!("wrote {}", path.display());
    }
    println!("# {}", path.display());
    print_json(settings)
}
