//! Planner prompt construction.

use std::fmt::Write as _;

use dyno_core::TableDescriptor;

/// Describe a table's key schema for the model.
pub fn schema_description(table: &TableDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Table Name: {}", table.name);
    let _ = writeln!(
        out,
        "Partition Key: {} (Type: {})",
        table.partition_key.name, table.partition_key.key_type
    );
    match &table.sort_key {
        Some(sk) => {
            let _ = writeln!(out, "Sort Key: {} (Type: {})", sk.name, sk.key_type);
        }
        None => out.push_str("Sort Key: none (partition key only)\n"),
    }
    if !table.secondary_indexes.is_empty() {
        let _ = writeln!(
            out,
            "Global Secondary Indexes: {}",
            table.secondary_indexes.join(", ")
        );
    }
    out
}

const RULES: &str = r#"STRICT DYNAMODB RULES
- UPDATE and DELETE must uniquely identify items using the FULL primary key.
  - PK-only table: WHERE must include PK equality.
  - PK+SK table: WHERE must include BOTH PK and SK equality.
- If the user asks to UPDATE or DELETE multiple items but does NOT provide keys,
  you MUST return mode="plan" with operation="scan_then_write".
- In a scan_then_write plan, write.per_item.partiql_template uses the placeholders
  {{PK}} and, when the table has a sort key, {{SK}}. No other placeholders exist.
- The read projection of a scan_then_write plan must include every key attribute, or be ["*"].
- If a filter does not use the PK or a GSI partition key, set read.requires_scan=true.
- If read.requires_scan=true, set safety.needs_confirmation=true and safety.reason="full_table_scan".
- INSERT is only allowed as fully specified statements in mode="sql". Never use
  action="insert" in a plan.
- Only operate on the table described above.

OUTPUT JSON SCHEMA
{
  "mode": "sql" | "plan" | "refusal",
  "statements": ["<PartiQL>"],
  "plan": null | {
    "table": "<table name>",
    "operation": "select" | "scan_then_write",
    "read": {
      "partiql": "<PartiQL SELECT>",
      "requires_scan": true | false,
      "index": "<GSI name>" | null,
      "projection": ["<PK name>", "<SK name>"] | ["*"]
    },
    "write": null | {
      "action": "update" | "delete",
      "per_item": {
        "partiql_template": "<key-bounded PartiQL with {{PK}} and {{SK}} if the table has a sort key>"
      }
    },
    "safety": {
      "needs_confirmation": true | false,
      "reason": "none" | "full_table_scan" | "multi_item_write"
    }
  },
  "refusal": null | "<why the request cannot be served safely>"
}

DECISION RULES
- If the request can be satisfied with safe, key-bounded PartiQL, return mode="sql",
  populate "statements" and set "plan" to null.
- Otherwise return mode="plan", set "statements" to [] and produce a structured plan.
- For read-only requests that require scanning, use operation="select" and set "write" to null.
- Only use operation="scan_then_write" for multi-item UPDATE or DELETE.
- Return mode="refusal" with a short reason, empty "statements" and a null "plan" for
  aggregations (COUNT, SUM, AVG, GROUP BY), joins or other tables, schema changes
  (CREATE, DROP, ALTER), and writes that need generated per-item values such as
  random IDs or timestamps.

PARTIQL RULES
- Double quotes for table and attribute names.
- Single quotes for string values; double any single quote inside a string.
- INSERT: INSERT INTO "Table" VALUE {'attr': value, ...}
- Missing attribute: "attr" IS MISSING
- contains("attr", 'x'), begins_with("attr", 'A')"#;

/// The full prompt for one natural-language request.
pub fn build_prompt(request: &str, table: &TableDescriptor) -> String {
    format!(
        "You are a DynamoDB expert. Your job is to produce a SAFE execution plan for DynamoDB.\n\n\
         Return EXACTLY ONE valid JSON object and nothing else (no markdown, no backticks, no explanations).\n\n\
         INPUTS\n\
         Schema:\n{schema}\n\
         User request:\n{request}\n\n\
         {RULES}\n\n\
         Return ONLY the JSON object.\n",
        schema = schema_description(table),
        request = request.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::{KeyAttribute, KeyType};

    fn orders() -> TableDescriptor {
        let mut table = TableDescriptor::new(
            "orders",
            KeyAttribute::new("customer", KeyType::String),
            Some(KeyAttribute::new("placed_at", KeyType::Number)),
        );
        table.secondary_indexes = vec!["by_status".into(), "by_region".into()];
        table
    }

    #[test]
    fn test_schema_description() {
        let desc = schema_description(&orders());
        assert!(desc.contains("Partition Key: customer (Type: S)"));
        assert!(desc.contains("Sort Key: placed_at (Type: N)"));
        assert!(desc.contains("Global Secondary Indexes: by_status, by_region"));
    }

    #[test]
    fn test_schema_without_sort_key() {
        let table = TableDescriptor::new("t", KeyAttribute::new("id", KeyType::Number), None);
        assert!(schema_description(&table).contains("Sort Key: none"));
        assert!(!schema_description(&table).contains("Global Secondary"));
    }

    #[test]
    fn test_prompt_embeds_request_and_rules() {
        let prompt = build_prompt("  delete inactive orders ", &orders());
        assert!(prompt.contains("User request:\ndelete inactive orders\n"));
        assert!(prompt.contains("{{PK}}"));
        assert!(prompt.contains("mode=\"refusal\""));
        assert!(prompt.contains("Table Name: orders"));
    }
}
