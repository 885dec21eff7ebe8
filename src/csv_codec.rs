use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use log::warn;

use crate::models::{Side, Trade};

/// Canonical field order of the tabular trade row, shared by the CSV file
/// format and the spreadsheet mirror.
pub const FIELD_NAMES: [&str; 14] = [
    "id",
    "tradeNumber",
    "asset",
    "side",
    "date",
    "lots",
    "entryPrice",
    "exitPrice",
    "points",
    "result",
    "notes",
    "region",
    "structure",
    "trigger",
];

/// Human-readable header labels, same order as `FIELD_NAMES`.
pub const HEADER_LABELS: [&str; 14] = [
    "ID",
    "Nº do Trade",
    "Ativo",
    "Tipo (Compra/Venda)",
    "Data",
    "Contratos/Quantidade",
    "Preço de Entrada",
    "Preço de Saída",
    "Pontos",
    "Resultado Monetário/R$",
    "Observações",
    "Região",
    "Estrutura",
    "Gatilho",
];

/// Translate a header label back to its field name. Unknown headers pass
/// through as literal field names, so exports that already use raw field
/// names keep decoding.
pub fn label_to_field(label: &str) -> &str {
    let label = label.trim();
    HEADER_LABELS
        .iter()
        .position(|l| *l == label)
        .map(|i| FIELD_NAMES[i])
        .unwrap_or(label)
}

/// One trade as the 14 tabular columns, numbers in canonical dot-decimal
/// form. `f64::to_string` keeps integral values short ("2", not "2.0").
pub fn trade_to_row(trade: &Trade) -> Vec<String> {
    vec![
        trade.id.to_string(),
        trade.trade_number.to_string(),
        trade.asset.clone(),
        trade.side.label().to_string(),
        trade.date.clone(),
        trade.lots.to_string(),
        trade.entry_price.to_string(),
        trade.exit_price.to_string(),
        trade.points.to_string(),
        trade.result.to_string(),
        trade.notes.clone(),
        trade.region.clone(),
        trade.structure.clone(),
        trade.trigger.clone(),
    ]
}

#[derive(Debug, Default)]
pub struct DecodedCsv {
    pub trades: Vec<Trade>,
    /// Lines dropped for a field-count mismatch or an unparseable id.
    pub skipped: usize,
}

/// Encode trades (in ledger order) to the delimited text format.
///
/// Values are comma-joined with no quoting or escaping; an embedded comma
/// in a free-text field corrupts its row. That is the documented file
/// format, preserved rather than silently fixed.
pub fn encode(trades: &[Trade]) -> String {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    // Header writes are infallible on a Vec sink; keep the codec total.
    let _ = writer.write_record(HEADER_LABELS);
    for trade in trades {
        let _ = writer.write_record(trade_to_row(trade));
    }

    let bytes = writer.into_inner().unwrap_or_default();
    String::from_utf8(bytes).unwrap_or_default()
}

/// Decode a CSV document. The first line is the header; a label-to-field
/// reverse mapping translates known human labels while unknown headers
/// pass through as raw field names. Lines whose field count differs from
/// the header's are skipped with a warning. A row is accepted only when
/// its id parses as an integer; other numeric failures become NaN.
pub fn decode(text: &str) -> DecodedCsv {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(Ok(record)) => record
            .iter()
            .map(|label| label_to_field(label.trim_start_matches('\u{feff}')).to_string())
            .collect(),
        _ => return DecodedCsv::default(),
    };

    let mut out = DecodedCsv::default();
    for (line_num, record) in records.enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("CSV import: unreadable line {}: {}", line_num + 2, e);
                out.skipped += 1;
                continue;
            }
        };
        if record.len() != header.len() {
            warn!(
                "CSV import: line {} has {} fields, expected {} - skipped",
                line_num + 2,
                record.len(),
                header.len()
            );
            out.skipped += 1;
            continue;
        }

        let field = |name: &str| field_value(&header, &record, name);

        let id = match field("id").trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                warn!(
                    "CSV import: line {} has no valid trade id ('{}') - skipped",
                    line_num + 2,
                    field("id")
                );
                out.skipped += 1;
                continue;
            }
        };

        let side_text = field("side");
        let side = Side::parse(side_text).unwrap_or_else(|| {
            warn!(
                "CSV import: line {} has unknown side '{}', assuming {}",
                line_num + 2,
                side_text,
                Side::Buy.label()
            );
            Side::Buy
        });

        let num = |name: &str| field(name).trim().parse::<f64>().unwrap_or(f64::NAN);

        out.trades.push(Trade {
            id,
            trade_number: field("tradeNumber").trim().parse::<u32>().unwrap_or(0),
            asset: field("asset").trim().to_string(),
            side,
            date: field("date").trim().to_string(),
            lots: num("lots"),
            entry_price: num("entryPrice"),
            exit_price: num("exitPrice"),
            points: num("points"),
            result: num("result"),
            notes: field("notes").trim().to_string(),
            region: field("region").trim().to_string(),
            structure: field("structure").trim().to_string(),
            trigger: field("trigger").trim().to_string(),
        });
    }

    out
}

fn field_value<'a>(header: &[String], record: &'a csv::StringRecord, name: &str) -> &'a str {
    header
        .iter()
        .position(|f| f == name)
        .and_then(|i| record.get(i))
        .unwrap_or("")
}
