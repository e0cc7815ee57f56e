#[macro_export]
macro_rules! table {
    ($table:literal : $model:ty) => {
        impl $crate::database::macros::Table for $model {
            fn table() -> &'static str {
                $table
            }
        }
    };
}

/// A type stored in its own table.
pub trait Table {
    /// Returns the name of the table associated with the record.
    fn table() -> &'static str;
}

/// Defines a method to query the database using SQL.
///
/// # Syntax
/// ```ignore
/// [Base Type] > method_name(...arguments) > [Output Type] where "sql query"
/// ```
/// Where the `Base Type` is the type that the method is being defined for and the `Output Type` is the type that the method will return.
/// Every argument is bound to the query under its own name.
///
/// # Example
///
/// ```ignore
/// define_query! {
///     Comment > of_post(post_id: &str) > Vec<Comment>
///         where "SELECT * FROM comments WHERE postId = $post_id ORDER BY createdAt ASC"
/// }
///
/// let comments = Comment::of_post(&post_id, &db).await?;
/// ```
#[macro_export]
macro_rules! define_query {
    ($model:ty > $relation:ident ($($binding:ident : $binding_type:ty),*) > $export:ty where $query:literal) => {
        impl $model {
            #[tracing::instrument(level = "debug", skip(db))]
            pub async fn $relation($($binding : $binding_type ,)* db: &$crate::database::Database) -> Result<$export, $crate::database::DatabaseQueryError> {
                use $crate::database::Sql as _;
                db.sql($query)
                    $(.bind((stringify!($binding), $binding)))*
                    .fetch_first()
                    .await
            }
        }
    };
}
