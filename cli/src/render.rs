use std::fmt::Write;

use delfin::{NewOrder, OrderRecord, OrderStats};

pub const EMPTY_LIST: &str = "No hay pedidos guardados\nComienza capturando tu primer pedido";

/// Renders an order the way it is shown for review and in listings.
pub fn order_card(order: &NewOrder) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pedido #{}  [{}]",
        or_dash(&order.order_number),
        order.display_status().label()
    );
    let _ = writeln!(out, "  Fecha: {}", order.date);
    let _ = writeln!(
        out,
        "  Cliente: {} ({})",
        or_dash(&order.client_name),
        or_dash(&order.client_number)
    );
    let _ = writeln!(out, "  Referencia: {}", or_dash(&order.reference_number));
    let _ = writeln!(out, "  Denominación: {}", or_dash(&order.denomination));
    let _ = writeln!(out, "  Cantidad: {} metros lineales", order.quantity_meters);
    if !order.notes.is_empty() {
        let _ = writeln!(out, "  Notas: {}", order.notes);
    }
    out
}

pub fn record_card(record: &OrderRecord) -> String {
    format!("[{}] {}", record.id, order_card(&record.order))
}

pub fn order_list(records: &[OrderRecord]) -> String {
    if records.is_empty() {
        return format!("{EMPTY_LIST}\n");
    }
    records
        .iter()
        .map(record_card)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn stats(stats: &OrderStats) -> String {
    format!(
        "Total de pedidos: {}\nPedidos de hoy: {}\nPendientes: {}\n",
        stats.total, stats.today_count, stats.pending_count
    )
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order() -> NewOrder {
        delfin::example_order(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    #[test]
    fn test_card_shows_every_field() {
        let card = order_card(&order());
        assert!(card.starts_with("Pedido #PED-2024-001  [Pendiente]"));
        assert!(card.contains("Cliente: Empresa Ejemplo S.L. (CLI-12345)"));
        assert!(card.contains("Cantidad: 125.5 metros lineales"));
        assert!(card.contains("Notas: Entrega urgente - Cliente preferente"));
    }

    #[test]
    fn test_card_omits_empty_notes() {
        let mut order = order();
        order.notes.clear();
        order.client_number.clear();
        let card = order_card(&order);
        assert!(!card.contains("Notas:"));
        assert!(card.contains("(-)"));
    }

    #[test]
    fn test_unknown_status_reads_pending() {
        let mut order = order();
        order.status = "archivado".to_string();
        assert!(order_card(&order).contains("[Pendiente]"));
    }

    #[test]
    fn test_empty_list() {
        assert!(order_list(&[]).starts_with("No hay pedidos guardados"));
    }
}
