use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::spotify::api::Accounts;
use crate::spotify::Router;

/// Accept connections until the listener fails, each connection is served on its own task
pub async fn serve<A>(listener: TcpListener, router: Router<A>) -> Result<()>
where
    A: Accounts + Send + Sync + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let router = router.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, router).await {
                log::warn!("error serving connection from {peer}: {err:?}");
            }
        });
    }
}
