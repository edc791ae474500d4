/// Splits a script body into candidate statements: carriage returns
/// are stripped, the body is split on `;`, and blank pieces dropped.
///
/// The splitter is deliberately naive. It does not understand string
/// literals, comments, or procedural bodies, so a `;` inside a literal
/// terminates the statement early. Scripts that need embedded
/// semicolons are out of scope.
pub fn split_statements(sql: &str) -> Vec<String> {
    sql.replace('\r', "")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
