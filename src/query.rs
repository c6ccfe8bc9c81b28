/// Minimal SELECT builder with slot joins
///
/// Just enough query building to select host rows and left-join their slots
/// in the same statement. Conditions are raw SQL fragments with `?`
/// placeholders; table and alias names are checked identifiers.

use crate::error::{ensure_identifier, SlotError};
use crate::slot::relation::SlotRelation;
use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// Default alias of the host table in generated queries
pub const DEFAULT_ROOT_ALIAS: &str = "c";

/// Default alias of the joined slot table
pub const DEFAULT_SLOTS_ALIAS: &str = "a";

/// A bind parameter for a query condition
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Integer(i64),
    Text(String),
    Null,
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        QueryParam::Integer(value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        QueryParam::Text(value)
    }
}

/// A slot relation joined into a query under `alias`
#[derive(Debug, Clone, PartialEq)]
pub struct SlotJoin {
    pub relation: SlotRelation,
    pub alias: String,
}

impl SlotJoin {
    /// Alias of the reference table for this join
    pub fn ref_alias(&self) -> String {
        format!("{}__ref", self.alias)
    }

    /// Prefix of the slot columns this join adds to the select list
    pub fn column_prefix(&self) -> String {
        format!("{}__", self.alias)
    }
}

/// SELECT over one root table
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    alias: String,
    joins: Vec<SlotJoin>,
    conditions: Vec<String>,
    params: Vec<QueryParam>,
    order_by: Vec<String>,
    limit: Option<i64>,
}

impl SelectQuery {
    /// Select every column of `table`, aliased `alias`
    pub fn new(table: &str, alias: &str) -> Result<Self, SlotError> {
        ensure_identifier(table)?;
        ensure_identifier(alias)?;

        Ok(Self {
            table: table.to_string(),
            alias: alias.to_string(),
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn root_alias(&self) -> &str {
        &self.alias
    }

    pub fn slot_joins(&self) -> &[SlotJoin] {
        &self.joins
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// AND a condition onto the WHERE clause
    pub fn filter<I, P>(mut self, condition: &str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<QueryParam>,
    {
        self.conditions.push(condition.to_string());
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by.push(clause.to_string());
        self
    }

    /// Row limit; with slot joins this counts joined rows, not hosts
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the statement
    pub fn to_sql(&self) -> String {
        let mut columns = vec![format!("{}.*", self.alias)];
        for join in &self.joins {
            let prefix = join.column_prefix();
            for column in ["id", "name", "type", "value"] {
                columns.push(format!("{}.{} AS {}{}", join.alias, column, prefix, column));
            }
        }

        let mut sql = format!(
            "SELECT {} FROM {} {}",
            columns.join(", "),
            self.table,
            self.alias
        );

        for join in &self.joins {
            let relation = &join.relation;
            let ref_alias = join.ref_alias();
            sql.push_str(&format!(
                " LEFT JOIN {ref_table} {ref_alias} ON {ref_alias}.{local} = {root}.{host_key}",
                ref_table = relation.ref_table,
                ref_alias = ref_alias,
                local = relation.local_column,
                root = self.alias,
                host_key = relation.host_key,
            ));
            sql.push_str(&format!(
                " LEFT JOIN {slot} {alias} ON {alias}.id = {ref_alias}.{foreign}",
                slot = relation.slot_table,
                alias = join.alias,
                ref_alias = ref_alias,
                foreign = relation.foreign_column,
            ));
        }

        if !self.conditions.is_empty() {
            let conditions: Vec<String> = self
                .conditions
                .iter()
                .map(|condition| format!("({})", condition))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let mut order_by = self.order_by.clone();
        if let Some(first) = self.joins.first() {
            order_by.push(format!("{}.{}", self.alias, first.relation.host_key));
        }
        for join in &self.joins {
            order_by.push(format!("{}.rowid", join.ref_alias()));
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    /// Run the statement
    pub async fn fetch_all(&self, pool: &SqlitePool) -> Result<Vec<SqliteRow>> {
        let sql = self.to_sql();
        tracing::debug!("Running query: {}", sql);

        let mut query = sqlx::query(&sql);
        for param in &self.params {
            query = match param {
                QueryParam::Integer(value) => query.bind(*value),
                QueryParam::Text(value) => query.bind(value.as_str()),
                QueryParam::Null => query.bind(None::<i64>),
            };
        }

        Ok(query.fetch_all(pool).await?)
    }
}

/// Left-join a relation's slots into `query` under `slots_alias`
///
/// Fails when the query does not select from the relation's host table, when
/// the alias is the query's root alias, or when the alias is already joined.
pub fn add_slot_join(
    mut query: SelectQuery,
    relation: &SlotRelation,
    slots_alias: &str,
) -> Result<SelectQuery, SlotError> {
    if query.table() != relation.host_table {
        return Err(SlotError::HostMismatch {
            table: query.table().to_string(),
            host: relation.host_table.clone(),
        });
    }
    if query.root_alias() == slots_alias {
        return Err(SlotError::AliasCollision {
            root: query.root_alias().to_string(),
            slots: slots_alias.to_string(),
        });
    }
    if query.joins.iter().any(|join| join.alias == slots_alias) {
        return Err(SlotError::DuplicateAlias(slots_alias.to_string()));
    }
    ensure_identifier(slots_alias)?;

    query.joins.push(SlotJoin {
        relation: relation.clone(),
        alias: slots_alias.to_string(),
    });

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation() -> SlotRelation {
        SlotRelation::for_host("post", "id", "slot").unwrap()
    }

    #[test]
    fn plain_select() {
        let query = SelectQuery::new("post", "p")
            .unwrap()
            .filter("p.title = ?", ["hello"])
            .filter("p.id > ?", [3i64])
            .order_by("p.title DESC")
            .limit(10);

        assert_eq!(
            query.to_sql(),
            "SELECT p.* FROM post p WHERE (p.title = ?) AND (p.id > ?) ORDER BY p.title DESC LIMIT 10"
        );
        assert_eq!(
            query.params(),
            &[QueryParam::Text("hello".to_string()), QueryParam::Integer(3)]
        );
    }

    #[test]
    fn joins_slots_through_reference_table() {
        let query = add_slot_join(SelectQuery::new("post", "c").unwrap(), &relation(), "a").unwrap();

        assert_eq!(
            query.to_sql(),
            "SELECT c.*, a.id AS a__id, a.name AS a__name, a.type AS a__type, a.value AS a__value \
             FROM post c \
             LEFT JOIN post_slot a__ref ON a__ref.post_id = c.id \
             LEFT JOIN slot a ON a.id = a__ref.slot_id \
             ORDER BY c.id, a__ref.rowid"
        );
    }

    #[test]
    fn alias_collision_is_rejected() {
        let err = add_slot_join(SelectQuery::new("post", "a").unwrap(), &relation(), "a").unwrap_err();

        assert_eq!(
            err,
            SlotError::AliasCollision {
                root: "a".to_string(),
                slots: "a".to_string()
            }
        );
    }

    #[test]
    fn join_requires_the_host_table() {
        let err = add_slot_join(SelectQuery::new("page", "c").unwrap(), &relation(), "a").unwrap_err();

        assert_eq!(
            err,
            SlotError::HostMismatch {
                table: "page".to_string(),
                host: "post".to_string()
            }
        );
    }

    #[test]
    fn each_slots_alias_joins_once() {
        let query = add_slot_join(SelectQuery::new("post", "c").unwrap(), &relation(), "a").unwrap();
        let err = add_slot_join(query, &relation(), "a").unwrap_err();

        assert_eq!(err, SlotError::DuplicateAlias("a".to_string()));
    }

    #[test]
    fn alias_must_be_identifier() {
        let err = add_slot_join(SelectQuery::new("post", "c").unwrap(), &relation(), "a b").unwrap_err();
        assert_eq!(err, SlotError::InvalidIdentifier("a b".to_string()));
    }
}
