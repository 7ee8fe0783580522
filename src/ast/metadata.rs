/// Table and column metadata for a parsed statement.
///
/// Callers use this to label result sets without generating any backend
/// text, so the collector only looks at the statement's table and, for a
/// SELECT, its projection list.
use serde::Serialize;

use super::types::*;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metadata {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
    pub columns: Vec<ColumnMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub table: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl ColumnMeta {
    /// The label a result set carries for this column.
    pub fn result_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl Metadata {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(ColumnMeta::result_name).collect()
    }
}

pub fn collect(statement: &Statement) -> Metadata {
    let table = statement.table();
    let columns = match statement {
        Statement::Select(select) => select.columns.iter().filter_map(column_meta).collect(),
        Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_) => vec![],
    };

    Metadata {
        schema: table.schema.clone(),
        table: table.name.clone(),
        alias: table.alias.clone(),
        columns,
    }
}

fn column_meta(column: &Column) -> Option<ColumnMeta> {
    if column.function.is_some() {
        // Function columns are labelled by their mandatory alias.
        return column.alias.clone().map(|name| ColumnMeta {
            table: None,
            name,
            alias: None,
        });
    }

    let operand = column.operands.first()?;
    Some(ColumnMeta {
        table: operand.table.clone(),
        name: operand.column.clone(),
        alias: column.alias.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse;

    #[test]
    fn test_collect_select_metadata() {
        let ast = parse("select id as k, users.name as n, wms.users.age from wms.topic as t").unwrap();
        let meta = collect(&ast);

        assert_eq!(meta.schema.as_deref(), Some("wms"));
        assert_eq!(meta.table, "topic");
        assert_eq!(meta.alias.as_deref(), Some("t"));
        assert_eq!(meta.columns.len(), 3);

        assert_eq!(meta.columns[0].name, "id");
        assert_eq!(meta.columns[0].alias.as_deref(), Some("k"));
        assert_eq!(meta.columns[1].table.as_deref(), Some("users"));
        assert_eq!(meta.columns[2].table.as_deref(), Some("users"));
        assert_eq!(meta.columns[2].alias, None);
        assert_eq!(meta.column_names(), vec!["k", "n", "age"]);
    }

    #[test]
    fn test_collect_function_column() {
        let ast = parse("select count(id) as total from logs").unwrap();
        let meta = collect(&ast);
        assert_eq!(
            meta.columns,
            vec![ColumnMeta {
                table: None,
                name: "total".into(),
                alias: None,
            }]
        );
    }

    #[test]
    fn test_collect_non_select_has_no_columns() {
        for bql in [
            "delete from wms.users where id = 1",
            "update wms.users set name = 'x'",
            "insert into wms.users (id) values (1)",
        ] {
            let meta = collect(&parse(bql).unwrap());
            assert_eq!(meta.schema.as_deref(), Some("wms"), "{}", bql);
            assert_eq!(meta.table, "users");
            assert!(meta.columns.is_empty());
        }
    }

    #[test]
    fn test_metadata_serializes() {
        let meta = collect(&parse("select id from logs").unwrap());
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["table"], "logs");
        assert_eq!(json["columns"][0]["name"], "id");
    }
}
