//! GraphQL document construction.
//!
//! Every query sent to AniList is assembled here, so the alias conventions
//! (`u{i}` for user batches, `p{page}` for pagination windows) are enforced
//! in exactly one place. Builders perform no I/O and cannot fail except on
//! the argument contracts they check up front.

use serde_json::{Map, Value};

use crate::error::ApiError;

/// A rendered GraphQL document plus its variable bindings.
#[derive(Debug, Clone)]
pub struct QueryDocument {
    pub query: String,
    pub variables: Map<String, Value>,
}

/// Identifies the users of a batched completed-list query.
///
/// A batch is homogeneous: usernames and numeric ids are never mixed, and
/// the enum makes a mixed batch unrepresentable.
#[derive(Debug, Clone)]
pub enum UserSelector {
    Names(Vec<String>),
    Ids(Vec<i64>),
}

impl UserSelector {
    fn is_empty(&self) -> bool {
        match self {
            UserSelector::Names(names) => names.is_empty(),
            UserSelector::Ids(ids) => ids.is_empty(),
        }
    }
}

/// Alias of the i-th (1-based) user sub-query in a batch.
pub fn user_alias(index: usize) -> String {
    format!("u{}", index)
}

/// Alias of a page sub-query in a pagination window.
pub fn page_alias(page: i64) -> String {
    format!("p{}", page)
}

const COMPLETED_FRAGMENT: &str = "\
fragment completedEntries on MediaListGroup {
  entries {
    mediaId
    media {
      title {
        romaji
      }
    }
    score(format: POINT_100)
  }
}";

const COMPLETER_FRAGMENT: &str = "\
fragment completerPage on Page {
  pageInfo {
    currentPage
    hasNextPage
  }
  mediaList(mediaId: $mediaId, status: COMPLETED) {
    userId
    score(format: POINT_100)
  }
}";

/// Incrementally assembles one operation: variable declarations, bindings,
/// aliased selections and shared fragments, rendered into a single document.
#[derive(Debug)]
struct DocumentBuilder {
    operation: &'static str,
    declarations: Vec<String>,
    selections: Vec<String>,
    fragments: Vec<&'static str>,
    bindings: Map<String, Value>,
}

impl DocumentBuilder {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            declarations: Vec::new(),
            selections: Vec::new(),
            fragments: Vec::new(),
            bindings: Map::new(),
        }
    }

    /// Declare a variable without binding it. Unbound nullable variables are
    /// how the planning query keeps one document for both lookup modes.
    fn declare(&mut self, name: &str, gql_type: &str) -> &mut Self {
        self.declarations.push(format!("${}: {}", name, gql_type));
        self
    }

    /// Bind a value to an already declared variable.
    fn bind(&mut self, name: &str, value: Value) -> &mut Self {
        self.bindings.insert(name.to_string(), value);
        self
    }

    /// Declare a variable and bind its value in one step.
    fn variable(&mut self, name: String, gql_type: &str, value: Value) -> &mut Self {
        self.declare(&name, gql_type);
        self.bindings.insert(name, value);
        self
    }

    /// Add an aliased selection to the operation body.
    fn select(&mut self, alias: &str, body: &str) -> &mut Self {
        self.selections.push(format!("{}: {}", alias, body));
        self
    }

    /// Add an unaliased selection to the operation body.
    fn select_raw(&mut self, body: &str) -> &mut Self {
        self.selections.push(body.to_string());
        self
    }

    fn fragment(&mut self, fragment: &'static str) -> &mut Self {
        self.fragments.push(fragment);
        self
    }

    fn build(self) -> QueryDocument {
        let mut query = format!(
            "query {}({}) {{\n{}\n}}",
            self.operation,
            self.declarations.join(", "),
            self.selections.join("\n"),
        );
        for fragment in &self.fragments {
            query.push_str("\n\n");
            query.push_str(fragment);
        }
        QueryDocument {
            query,
            variables: self.bindings,
        }
    }
}

/// Batched completed-list query: one aliased `MediaListCollection` selection
/// per user, scores on the 0-100 scale.
///
/// Batching N users into one document amortizes the request interval: the
/// whole batch costs one round trip instead of N.
pub fn completed_list(users: &UserSelector) -> Result<QueryDocument, ApiError> {
    if users.is_empty() {
        return Err(ApiError::Contract(
            "a completed-list batch needs at least one user".to_string(),
        ));
    }

    let mut doc = DocumentBuilder::new("UserAnime");
    doc.fragment(COMPLETED_FRAGMENT);

    match users {
        UserSelector::Names(names) => {
            for (i, name) in names.iter().enumerate() {
                user_selection(
                    &mut doc,
                    i + 1,
                    "userName",
                    "username",
                    "String",
                    Value::String(name.clone()),
                );
            }
        }
        UserSelector::Ids(ids) => {
            for (i, id) in ids.iter().enumerate() {
                user_selection(&mut doc, i + 1, "userId", "id", "Int", Value::from(*id));
            }
        }
    }

    Ok(doc.build())
}

fn user_selection(
    doc: &mut DocumentBuilder,
    index: usize,
    user_param: &str,
    var_prefix: &str,
    gql_type: &'static str,
    value: Value,
) {
    let var_name = format!("{}{}", var_prefix, index);
    let body = format!(
        "MediaListCollection({}: ${}, type: ANIME, forceSingleCompletedList: true, status: COMPLETED) {{ lists {{ ...completedEntries }} }}",
        user_param, var_name
    );
    doc.variable(var_name, gql_type, value);
    doc.select(&user_alias(index), &body);
}

/// Planning-list query for a single user.
///
/// Exactly one of `user_id`/`user_name` must be given; both or neither is a
/// contract violation raised before any network traffic.
pub fn planning_list(
    user_id: Option<i64>,
    user_name: Option<&str>,
) -> Result<QueryDocument, ApiError> {
    let mut doc = DocumentBuilder::new("UserPlanning");
    doc.declare("id", "Int").declare("username", "String");

    match (user_id, user_name) {
        (Some(id), None) => {
            doc.bind("id", Value::from(id));
        }
        (None, Some(name)) => {
            doc.bind("username", Value::String(name.to_string()));
        }
        _ => {
            return Err(ApiError::Contract(
                "exactly one of user id or user name must be provided".to_string(),
            ));
        }
    }

    doc.select_raw(
        "MediaListCollection(userId: $id, userName: $username, type: ANIME, status: PLANNING) \
         { lists { entries { mediaId media { title { romaji } } } } }",
    );

    Ok(doc.build())
}

/// Pagination-window query over the completers of one media id.
///
/// Pages `first_page .. first_page + pages` become independent aliased `Page`
/// selections sharing `$perPage` and `$mediaId`, so a whole window costs one
/// round trip.
pub fn completer_pages(media_id: i64, first_page: i64, pages: i64, per_page: i64) -> QueryDocument {
    let mut doc = DocumentBuilder::new("MediaCompleters");
    doc.fragment(COMPLETER_FRAGMENT);
    doc.variable("mediaId".to_string(), "Int", Value::from(media_id));
    doc.variable("perPage".to_string(), "Int", Value::from(per_page));

    for page in first_page..first_page + pages {
        let var_name = format!("page{}", page);
        let body = format!("Page(page: ${}, perPage: $perPage) {{ ...completerPage }}", var_name);
        doc.variable(var_name, "Int", Value::from(page));
        doc.select(&page_alias(page), &body);
    }

    doc.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_list_by_names_declares_one_alias_per_user() {
        let users = UserSelector::Names(vec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string(),
        ]);
        let doc = completed_list(&users).unwrap();

        assert_eq!(doc.variables.len(), 3);
        for i in 1..=3 {
            assert!(doc.query.contains(&format!("${}{}: String", "username", i)));
            assert!(doc.query.contains(&format!("u{}: MediaListCollection", i)));
        }
        assert_eq!(doc.variables["username2"], Value::from("bob"));
        assert!(doc.query.contains("forceSingleCompletedList: true"));
        assert!(doc.query.contains("score(format: POINT_100)"));
    }

    #[test]
    fn completed_list_by_ids_uses_int_variables() {
        let users = UserSelector::Ids(vec![101, 102]);
        let doc = completed_list(&users).unwrap();

        assert_eq!(doc.variables.len(), 2);
        assert!(doc.query.contains("$id1: Int"));
        assert!(doc.query.contains("$id2: Int"));
        assert_eq!(doc.variables["id1"], Value::from(101));
        assert_eq!(doc.variables["id2"], Value::from(102));
    }

    #[test]
    fn completed_list_rejects_an_empty_batch() {
        let err = completed_list(&UserSelector::Ids(Vec::new())).unwrap_err();
        assert!(matches!(err, ApiError::Contract(_)));
    }

    #[test]
    fn planning_list_binds_exactly_one_variable() {
        let doc = planning_list(None, Some("alice")).unwrap();
        // Both variables are declared, only the given one is bound
        assert!(doc.query.contains("$id: Int"));
        assert!(doc.query.contains("$username: String"));
        assert_eq!(doc.variables.len(), 1);
        assert_eq!(doc.variables["username"], Value::from("alice"));

        let doc = planning_list(Some(7), None).unwrap();
        assert_eq!(doc.variables.len(), 1);
        assert_eq!(doc.variables["id"], Value::from(7));
    }

    #[test]
    fn planning_list_rejects_both_and_neither() {
        assert!(matches!(
            planning_list(Some(7), Some("alice")),
            Err(ApiError::Contract(_))
        ));
        assert!(matches!(planning_list(None, None), Err(ApiError::Contract(_))));
    }

    #[test]
    fn completer_pages_aliases_every_page_in_the_window() {
        let doc = completer_pages(42, 3, 5, 50);

        // mediaId + perPage + one variable per page
        assert_eq!(doc.variables.len(), 7);
        assert_eq!(doc.variables["mediaId"], Value::from(42));
        assert_eq!(doc.variables["perPage"], Value::from(50));
        for page in 3..8 {
            assert!(doc.query.contains(&format!("p{}: Page(page: $page{}", page, page)));
            assert_eq!(doc.variables[&format!("page{}", page)], Value::from(page));
        }
        assert!(!doc.query.contains("p8:"));
    }
}
