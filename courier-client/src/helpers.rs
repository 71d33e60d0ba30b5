//! Free helpers for working with several requests at once.

use std::future::Future;

use crate::ClientError;

/// Returns true if `err` is a cancellation.
pub fn is_cancel(err: &ClientError) -> bool {
    err.is_cancel()
}

/// Wait for every future, failing fast on the first error.
///
/// Results are returned in input order.
///
/// # Example
///
/// ```ignore
/// let responses = courier_client::all([client.get("/a"), client.get("/b")]).await?;
/// ```
pub async fn all<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    futures::future::try_join_all(futures).await
}

/// Calling a function with its arguments packed into a tuple or array.
pub trait Spread<Args> {
    type Output;

    fn call_spread(self, args: Args) -> Self::Output;
}

macro_rules! impl_spread_tuple {
    ($($arg:ident),+) => {
        impl<Func, Ret, $($arg),+> Spread<($($arg,)+)> for Func
        where
            Func: FnOnce($($arg),+) -> Ret,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn call_spread(self, ($($arg,)+): ($($arg,)+)) -> Ret {
                self($($arg),+)
            }
        }
    };
}

impl_spread_tuple!(A);
impl_spread_tuple!(A, B);
impl_spread_tuple!(A, B, C);
impl_spread_tuple!(A, B, C, D);

macro_rules! impl_spread_array {
    (@ty $t:ident $item:ident) => { $t };
    ($len:literal => $($item:ident),+) => {
        impl<Func, Ret, T> Spread<[T; $len]> for Func
        where
            Func: FnOnce($(impl_spread_array!(@ty T $item)),+) -> Ret,
        {
            type Output = Ret;

            fn call_spread(self, [$($item),+]: [T; $len]) -> Ret {
                self($($item),+)
            }
        }
    };
}

impl_spread_array!(2 => a, b);
impl_spread_array!(3 => a, b, c);
impl_spread_array!(4 => a, b, c, d);

/// Adapt a multi-argument function to take its arguments as one tuple or
/// array, the shape joined results come back in.
///
/// # Example
///
/// ```
/// use courier_client::spread;
///
/// let add = spread(|a: i32, b: i32| a + b);
/// assert_eq!(add((1, 2)), 3);
///
/// let join = spread(|a: &str, b: &str, c: &str| format!("{a}{b}{c}"));
/// assert_eq!(join(["x", "y", "z"]), "xyz");
/// ```
pub fn spread<F, Args>(f: F) -> impl FnOnce(Args) -> F::Output
where
    F: Spread<Args>,
{
    move |args| f.call_spread(args)
}
