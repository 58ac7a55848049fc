//! DB operation interface logic, primarily for generating database operation
//! shim functions.
//!
//! The `inst_ops_simple!` macro manages the indirection required to spawn
//! async requests onto a thread pool and execute blocking calls locally.

pub use moraine_db_types::{DbError, DbResult};

/// Handle for receiving a result from a database operation.
pub type DbRecv<T> = tokio::sync::oneshot::Receiver<DbResult<T>>;

/// Generates an `Ops` interface with shim functions for database operations,
/// providing async, blocking, and channel-based variants of each method
/// without the caller having to carry the database type parameter around.
///
/// ### Usage
/// ```ignore
/// inst_ops_simple! {
///     (<D: BlockStoreDatabase> => BlockStoreOps) {
///         get_tip_blockid() => Option<BlockId>;
///         put_blocks(new_tip: BlockId, blocks: Vec<RawBlock>) => ();
///     }
/// }
/// ```
///
/// For each method `foo(arg: Type) => ReturnType` this generates:
/// - `foo_async(&self, arg: Type) -> DbResult<ReturnType>`
/// - `foo_blocking(&self, arg: Type) -> DbResult<ReturnType>`
/// - `foo_chan(&self, arg: Type) -> DbRecv<ReturnType>`
macro_rules! inst_ops_simple {
    {
        ( < $tparam:ident : $tpconstr:tt > => $base:ident )
        {
            $(
                $iname:ident ( $( $aname:ident : $aty:ty ),* $(,)? ) => $ret:ty;
            )* $(,)?
        }
    } => {
        #[derive(Debug)]
        pub struct Context<$tparam: $tpconstr> {
            db: ::std::sync::Arc<$tparam>,
        }

        impl<$tparam: $tpconstr + Sync + Send + 'static> Context<$tparam> {
            pub fn new(db: ::std::sync::Arc<$tparam>) -> Self {
                Self { db }
            }

            pub fn into_ops(self, pool: ::threadpool::ThreadPool) -> $base {
                $base::new(pool, ::std::sync::Arc::new(self))
            }
        }

        #[expect(
            missing_debug_implementations,
            reason = "inner shim type doesn't have a Debug implementation"
        )]
        pub struct $base {
            pool: ::threadpool::ThreadPool,
            inner: ::std::sync::Arc<dyn ShimTrait>,
        }

        ::paste::paste! {
            impl $base {
                pub fn new<$tparam: $tpconstr + Sync + Send + 'static>(
                    pool: ::threadpool::ThreadPool,
                    ctx: ::std::sync::Arc<Context<$tparam>>,
                ) -> Self {
                    Self {
                        pool,
                        inner: ::std::sync::Arc::new(Inner { ctx }),
                    }
                }

                $(
                    pub async fn [<$iname _async>](&self, $($aname: $aty),*) -> $crate::exec::DbResult<$ret> {
                        let resp_rx = self.inner.[<$iname _chan>](&self.pool, $($aname),*);
                        match resp_rx.await {
                            Ok(v) => v,
                            Err(_e) => Err($crate::exec::DbError::WorkerFailedStrangely),
                        }
                    }

                    pub fn [<$iname _blocking>](&self, $($aname: $aty),*) -> $crate::exec::DbResult<$ret> {
                        self.inner.[<$iname _blocking>]($($aname),*)
                    }

                    pub fn [<$iname _chan>](&self, $($aname: $aty),*) -> $crate::exec::DbRecv<$ret> {
                        self.inner.[<$iname _chan>](&self.pool, $($aname),*)
                    }
                )*
            }

            trait ShimTrait: Sync + Send + 'static {
                $(
                    fn [<$iname _blocking>](&self, $($aname: $aty),*) -> $crate::exec::DbResult<$ret>;
                    fn [<$iname _chan>](&self, pool: &::threadpool::ThreadPool, $($aname: $aty),*) -> $crate::exec::DbRecv<$ret>;
                )*
            }

            #[derive(Debug)]
            struct Inner<$tparam: $tpconstr + Sync + Send + 'static> {
                ctx: ::std::sync::Arc<Context<$tparam>>,
            }

            impl<$tparam: $tpconstr + Sync + Send + 'static> ShimTrait for Inner<$tparam> {
                $(
                    fn [<$iname _blocking>](&self, $($aname: $aty),*) -> $crate::exec::DbResult<$ret> {
                        self.ctx.db.as_ref().$iname($($aname),*)
                    }

                    fn [<$iname _chan>](&self, pool: &::threadpool::ThreadPool, $($aname: $aty),*) -> $crate::exec::DbRecv<$ret> {
                        let (resp_tx, resp_rx) = ::tokio::sync::oneshot::channel();
                        let ctx = self.ctx.clone();

                        pool.execute(move || {
                            let res = ctx.db.as_ref().$iname($($aname),*);
                            if resp_tx.send(res).is_err() {
                                ::tracing::warn!("failed to send response");
                            }
                        });

                        resp_rx
                    }
                )*
            }
        }
    };
}

pub(crate) use inst_ops_simple;
