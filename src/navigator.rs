use crate::{
    i18n, ColumnView, Command, Counter, Dictionary, Direction, Header, Identifier, Loader, Motion,
    Node, NodeId, Offset, RenderOptions, Request, Settings, Snag, Stage, Subtree, TreeFetcher,
    Trek,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Notifications the navigator sends to the embedding application.
#[derive(Debug, Clone, PartialEq, strum_macros::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Signal {
    /// The first column has loaded.  Carries the node it shows.
    Initialized(Node),
    /// A node was selected, either by drilling into it or by choosing a leaf.
    Select(Node),
    /// The user asked to add something under this node.
    Add(Node),
    /// A drill finished and this node is now current.
    Navigate(Node),
    /// A load failed.  Carries the message shown to the user.
    Failed(String),
}

/// Whether a column swap is under way.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    #[default]
    Idle,
    Transitioning,
}

/// A read-only picture of the navigator at one moment.
///
/// * phase - [`Phase::Transitioning`] while a drill is in flight.
/// * loading - True while any errand is in flight, including reloads and page loads.
/// * current - The node the current column shows.
/// * parent - Its parent, `None` at the root.
/// * children - The rows of the current column, in order.
/// * has_next_page - Whether `next-page` has anything left to load.
/// * search - The active search term.
/// * generation - Token of the newest errand.
/// * cached - Keys in the node cache, sorted.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct Snapshot {
    phase: Phase,
    loading: bool,
    current: Node,
    parent: Option<Node>,
    children: Vec<Node>,
    has_next_page: bool,
    search: Option<String>,
    generation: u64,
    cached: Vec<NodeId>,
}

impl Snapshot {
    /// Ids of the children, in order.
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.iter().map(|child| child.id().clone()).collect()
    }
}

type Reply = oneshot::Sender<Trek<()>>;

/// Messages from a [`Handle`] to the navigator task.
#[derive(Debug)]
enum Order {
    Command {
        command: Command,
        reply: Option<Reply>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
    Settle(oneshot::Sender<Snapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Messages from spawned loads and slide timers back to the navigator task.  Each carries the
/// generation of the errand that spawned it.
#[derive(Debug)]
enum Landing {
    Fetched { generation: u64, result: Trek<Value> },
    Slid { generation: u64 },
}

/// The live column, and what it knows about itself.
///
/// `node` is the id the column was requested under, which is also its cache key.  `base` is the
/// URL its children came from, and `page` the last page loaded.
#[derive(Debug)]
struct Column<V> {
    view: V,
    subtree: Subtree,
    node: NodeId,
    base: String,
    page: u32,
}

/// Work in flight.  A drill owns the incoming view until the slide completes, and holds the
/// subtree once it has arrived, along with the last page it holds.
#[derive(Debug)]
enum Errand<V> {
    Drill {
        direction: Direction,
        request: Request,
        incoming: V,
        arrived: Option<(Subtree, u32)>,
    },
    Reload {
        request: Request,
    },
    Page {
        request: Request,
    },
}

#[derive(Debug)]
struct Flight<V> {
    generation: u64,
    errand: Errand<V>,
    reply: Option<Reply>,
}

/// The `Navigator` is the drill-down controller.  It owns the current column, the
/// [`TreeFetcher`] and its cache, and at most one errand in flight.
///
/// The navigator runs as a task of its own, after the fashion of an actor: call
/// [`Navigator::spawn`] and talk to it through the returned [`Handle`].  Loads and slide timers
/// run on spawned tasks of their own and report back over a channel, so the navigator is never
/// blocked and the cache and views are only ever touched from the navigator task.
///
/// A drill goes fetch, parse, cache, render, slide, destroy the old column, in that order.  Only
/// one errand is in flight at a time:
///
/// * Drills and page loads that arrive while something is in flight get [`Snag::Busy`].
/// * Reloads, searches and url changes replace whatever is in flight.  The replaced errand
///   answers [`Snag::Superseded`], and if it was a drill its incoming column is destroyed.
///
/// Every errand is stamped with a generation from a [`Counter`].  A load or timer that reports
/// back for anything but the newest generation is discarded, so a slow response can never paint
/// over a newer column.  A failed load leaves the current column where it was, raises an alert
/// on the [`Stage`], and emits [`Signal::Failed`].
pub struct Navigator<L: Loader, S: Stage> {
    loader: Arc<L>,
    stage: S,
    fetcher: TreeFetcher,
    dictionary: Dictionary,
    container: String,
    slide: Duration,
    buffer: usize,
    current: Column<S::View>,
    flight: Option<Flight<S::View>>,
    generation: Counter,
    initialized: bool,
    signals: broadcast::Sender<Signal>,
    landings: mpsc::Sender<Landing>,
    inbox: Option<mpsc::Receiver<Landing>>,
    waiters: Vec<oneshot::Sender<Snapshot>>,
    farewell: Option<oneshot::Sender<()>>,
}

impl<L: Loader, S: Stage> Navigator<L, S> {
    /// Creates a navigator and places its first, empty column.  Nothing loads until
    /// [`Navigator::spawn`].
    #[tracing::instrument(skip_all)]
    pub fn new(settings: &Settings, loader: Arc<L>, mut stage: S) -> Self {
        let fetcher = TreeFetcher::new(
            settings.keys().clone(),
            settings.url(),
            *settings.limit(),
            settings.search_key(),
        );
        let buffer = (*settings.buffer()).max(1);
        let (signals, _) = broadcast::channel(buffer);
        let (landings, inbox) = mpsc::channel(buffer);
        let mut view = stage.create();
        view.place_at(settings.container());
        let current = Column {
            view,
            subtree: Subtree::empty(),
            node: NodeId::root(),
            base: settings.url().clone(),
            page: 1,
        };
        tracing::info!("Navigator ready for {}.", settings.url());
        Self {
            loader,
            stage,
            fetcher,
            dictionary: Dictionary::with_entries(settings.translations()),
            container: settings.container().clone(),
            slide: settings.slide(),
            buffer,
            current,
            flight: None,
            generation: Counter::default(),
            initialized: false,
            signals,
            landings,
            inbox: Some(inbox),
            waiters: Vec::new(),
            farewell: None,
        }
    }

    /// Subscribes to the [`Signal`] stream.  Subscribe before spawning to catch
    /// [`Signal::Initialized`].
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Starts the navigator on its own task and loads the root in place.
    pub fn spawn(self) -> Handle {
        let (tx, rx) = mpsc::channel(self.buffer);
        let signals = self.signals.clone();
        tokio::spawn(self.run(rx));
        Handle { tx, signals }
    }

    async fn run(mut self, mut orders: mpsc::Receiver<Order>) {
        let Some(mut inbox) = self.inbox.take() else {
            tracing::error!("Navigator started twice.");
            return;
        };
        let base = self.current.base.clone();
        self.reload(NodeId::root(), base, None);
        loop {
            tokio::select! {
                order = orders.recv() => match order {
                    Some(order) => {
                        if !self.order(order) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(landing) = inbox.recv() => self.land(landing),
            }
            self.release_waiters();
        }
        self.teardown();
    }

    /// Handles one order.  Returns false when the navigator should stop.
    fn order(&mut self, order: Order) -> bool {
        match order {
            Order::Command { command, reply } => self.command(command, reply),
            Order::Snapshot(tx) => {
                let _ = tx.send(self.snapshot());
            }
            Order::Settle(tx) => self.waiters.push(tx),
            Order::Shutdown(done) => {
                self.farewell = Some(done);
                return false;
            }
        }
        true
    }

    #[tracing::instrument(skip(self, reply), fields(command = %command))]
    fn command(&mut self, command: Command, reply: Option<Reply>) {
        match command {
            Command::DrillIn(id) => self.drill(Direction::In, id, reply),
            Command::DrillOut(id) => self.drill(Direction::Out, id, reply),
            Command::Choose(id) => {
                let result = match self.current.subtree.child(&id).cloned() {
                    Some(node) => {
                        self.emit(Signal::Select(node));
                        Ok(())
                    }
                    None => Err(Snag::UnknownNode(id)),
                };
                respond(reply, result);
            }
            Command::Add => {
                self.emit(Signal::Add(self.current.subtree.current().clone()));
                respond(reply, Ok(()));
            }
            Command::SetUrl(url) => {
                self.fetcher.set_root_url(&url);
                self.fetcher.cache_mut().delete_all();
                self.reload(NodeId::root(), url, reply);
            }
            Command::Reload { clear_cache } => {
                if clear_cache {
                    self.fetcher.cache_mut().delete_all();
                }
                self.reload_current(reply);
            }
            Command::ClearCache => {
                self.fetcher.cache_mut().delete_all();
                respond(reply, Ok(()));
            }
            Command::Search(term) => {
                self.fetcher.set_search(Some(term));
                self.reload_current(reply);
            }
            Command::SearchReset => {
                self.fetcher.set_search(None);
                self.reload_current(reply);
            }
            Command::NextPage => self.next_page(reply),
        }
    }

    /// Starts a drill toward `id`, answered from the cache when possible.
    fn drill(&mut self, direction: Direction, id: NodeId, reply: Option<Reply>) {
        if self.flight.is_some() {
            tracing::debug!("Already under way, ignoring drill {direction} to {id}.");
            respond(reply, Err(Snag::Busy));
            return;
        }
        let plan = match self.fetcher.plan(&id) {
            Ok(plan) => plan,
            Err(Snag::Leaf(id)) if direction == Direction::In => {
                // nothing below, so picking it is a selection
                let result = match self.current.subtree.child(&id).cloned() {
                    Some(node) => {
                        self.emit(Signal::Select(node));
                        Ok(())
                    }
                    None => Err(Snag::Leaf(id)),
                };
                respond(reply, result);
                return;
            }
            Err(snag) => {
                respond(reply, Err(snag));
                return;
            }
        };

        let generation = self.generation.next();
        let mut incoming = self.stage.create();
        incoming.place_at(&self.container);
        self.stage.animate(&mut incoming, Motion::snap(direction.entry()));
        let (request, cached) = plan.dissolve();
        let url = request.url().clone();
        tracing::debug!("Drill {direction} to {id} as generation {generation}.");
        self.flight = Some(Flight {
            generation,
            errand: Errand::Drill {
                direction,
                request,
                incoming,
                arrived: None,
            },
            reply,
        });
        match cached {
            Some(entry) => {
                let (subtree, page) = entry.dissolve();
                self.arrive(subtree, page);
            }
            None => self.fetch(generation, url),
        }
    }

    /// Renders the subtree of a drill, loaded through `page`, into the incoming column and starts
    /// the slide.
    fn arrive(&mut self, subtree: Subtree, page: u32) {
        let Some(Flight {
            generation,
            errand:
                Errand::Drill {
                    direction,
                    incoming,
                    arrived,
                    ..
                },
            ..
        }) = self.flight.as_mut()
        else {
            return;
        };
        let generation = *generation;
        let options = render_options(&self.dictionary, self.fetcher.search(), &subtree);
        incoming.render(&subtree, &options);
        self.stage.header(&header(&self.dictionary, &subtree));
        self.stage.animate(
            &mut self.current.view,
            Motion::new(direction.exit(), self.slide),
        );
        self.stage
            .animate(incoming, Motion::new(Offset::Center, self.slide));
        *arrived = Some((subtree, page));
        self.wait(generation);
    }

    fn reload_current(&mut self, reply: Option<Reply>) {
        let node = self.current.node.clone();
        let base = self.current.base.clone();
        self.reload(node, base, reply);
    }

    /// Refetches `node` from `base` and renders it into the current column.  Never reads the
    /// cache.
    fn reload(&mut self, node: NodeId, base: String, reply: Option<Reply>) {
        self.abandon();
        let generation = self.generation.next();
        let request = self.fetcher.request(&node, &base, 1);
        let url = request.url().clone();
        tracing::debug!("Reloading {node} from {url} as generation {generation}.");
        self.flight = Some(Flight {
            generation,
            errand: Errand::Reload { request },
            reply,
        });
        self.fetch(generation, url);
    }

    fn next_page(&mut self, reply: Option<Reply>) {
        if self.flight.is_some() {
            respond(reply, Err(Snag::Busy));
            return;
        }
        if !*self.current.subtree.has_next_page() {
            respond(reply, Err(Snag::LastPage));
            return;
        }
        let generation = self.generation.next();
        let request = self
            .fetcher
            .request(&self.current.node, &self.current.base, self.current.page + 1);
        let url = request.url().clone();
        tracing::debug!("Loading page {} as generation {generation}.", request.page());
        self.flight = Some(Flight {
            generation,
            errand: Errand::Page { request },
            reply,
        });
        self.fetch(generation, url);
    }

    /// Drops whatever is in flight, putting the current column back where it belongs.
    fn abandon(&mut self) {
        let Some(Flight {
            generation,
            errand,
            reply,
        }) = self.flight.take()
        else {
            return;
        };
        tracing::debug!("Abandoning generation {generation}.");
        if let Errand::Drill {
            incoming, arrived, ..
        } = errand
        {
            incoming.destroy();
            if arrived.is_some() {
                self.stage
                    .animate(&mut self.current.view, Motion::snap(Offset::Center));
                self.stage
                    .header(&header(&self.dictionary, &self.current.subtree));
            }
        }
        respond(reply, Err(Snag::Superseded));
    }

    /// Loads `url` on a separate task.
    fn fetch(&self, generation: u64, url: String) {
        let loader = Arc::clone(&self.loader);
        let landings = self.landings.clone();
        tokio::spawn(async move {
            let result = loader.load(&url).await;
            if landings
                .send(Landing::Fetched { generation, result })
                .await
                .is_err()
            {
                tracing::trace!("Navigator gone before {url} landed.");
            }
        });
    }

    /// Waits out the slide on a separate task.
    fn wait(&self, generation: u64) {
        let slide = self.slide;
        let landings = self.landings.clone();
        tokio::spawn(async move {
            tokio::time::sleep(slide).await;
            let _ = landings.send(Landing::Slid { generation }).await;
        });
    }

    fn land(&mut self, landing: Landing) {
        let (generation, fetched) = match landing {
            Landing::Fetched { generation, result } => (generation, Some(result)),
            Landing::Slid { generation } => (generation, None),
        };
        if self.flight.as_ref().map(|flight| flight.generation) != Some(generation) {
            tracing::debug!("Discarding stale landing from generation {generation}.");
            return;
        }
        match fetched {
            Some(result) => self.fetched(result),
            None => self.slid(),
        }
    }

    fn fetched(&mut self, result: Trek<Value>) {
        let Some(Flight {
            generation,
            errand,
            reply,
        }) = self.flight.take()
        else {
            return;
        };
        match errand {
            Errand::Drill {
                direction,
                request,
                incoming,
                ..
            } => match result.and_then(|raw| self.fetcher.settle(&request, &raw)) {
                Ok(subtree) => {
                    self.flight = Some(Flight {
                        generation,
                        errand: Errand::Drill {
                            direction,
                            request,
                            incoming,
                            arrived: None,
                        },
                        reply,
                    });
                    self.arrive(subtree, 1);
                }
                Err(snag) => {
                    incoming.destroy();
                    self.fail(snag, reply);
                }
            },
            Errand::Reload { request } => {
                match result.and_then(|raw| self.fetcher.settle(&request, &raw)) {
                    Ok(subtree) => self.reloaded(request, subtree, reply),
                    Err(snag) => self.fail(snag, reply),
                }
            }
            Errand::Page { request } => {
                match result.and_then(|raw| self.fetcher.settle(&request, &raw)) {
                    Ok(page) => self.paged(request, page, reply),
                    Err(snag) => self.fail(snag, reply),
                }
            }
        }
    }

    /// Finishes a drill: the incoming column becomes current and the old one goes.
    fn slid(&mut self) {
        let Some(Flight {
            generation,
            errand,
            reply,
        }) = self.flight.take()
        else {
            return;
        };
        let (direction, request, incoming, subtree, page) = match errand {
            Errand::Drill {
                direction,
                request,
                incoming,
                arrived: Some((subtree, page)),
            } => (direction, request, incoming, subtree, page),
            errand => {
                tracing::warn!("Slide finished for generation {generation}, but nothing arrived.");
                self.flight = Some(Flight {
                    generation,
                    errand,
                    reply,
                });
                return;
            }
        };
        let column = Column {
            view: incoming,
            subtree,
            node: request.node().clone(),
            base: request.base().clone(),
            page,
        };
        let old = std::mem::replace(&mut self.current, column);
        old.view.destroy();
        self.fetcher.remember(&self.current.subtree);
        let current = self.current.subtree.current().clone();
        tracing::info!("Now showing {}.", current.label());
        if direction == Direction::In {
            self.emit(Signal::Select(current.clone()));
        }
        self.emit(Signal::Navigate(current));
        respond(reply, Ok(()));
    }

    fn reloaded(&mut self, request: Request, subtree: Subtree, reply: Option<Reply>) {
        let options = render_options(&self.dictionary, self.fetcher.search(), &subtree);
        self.current.view.render(&subtree, &options);
        self.stage.header(&header(&self.dictionary, &subtree));
        self.current.subtree = subtree;
        self.current.node = request.node().clone();
        self.current.base = request.base().clone();
        self.current.page = 1;
        self.fetcher.remember(&self.current.subtree);
        if !self.initialized {
            self.initialized = true;
            tracing::info!("Navigator initialized.");
            self.emit(Signal::Initialized(self.current.subtree.current().clone()));
        }
        respond(reply, Ok(()));
    }

    fn paged(&mut self, request: Request, page: Subtree, reply: Option<Reply>) {
        self.current
            .subtree
            .extend(page.children(), *page.has_next_page());
        self.current.page = *request.page();
        let options = render_options(
            &self.dictionary,
            self.fetcher.search(),
            &self.current.subtree,
        );
        self.current.view.append(page.children(), &options);
        self.fetcher
            .extend_cached(&self.current.node, &self.current.subtree, self.current.page);
        self.fetcher.remember(&self.current.subtree);
        tracing::debug!(
            "Page {} added {} rows.",
            self.current.page,
            page.children().len()
        );
        respond(reply, Ok(()));
    }

    fn fail(&mut self, snag: Snag, reply: Option<Reply>) {
        let message = format!("{}: {snag}", self.dictionary.translate(i18n::FETCH_FAILED));
        self.stage.alert(&message);
        self.emit(Signal::Failed(message));
        respond(reply, Err(snag));
    }

    fn emit(&self, signal: Signal) {
        tracing::trace!("Emitting {}.", signal.as_ref());
        if self.signals.send(signal).is_err() {
            tracing::trace!("Nobody is listening.");
        }
    }

    fn snapshot(&self) -> Snapshot {
        let phase = match &self.flight {
            Some(Flight {
                errand: Errand::Drill { .. },
                ..
            }) => Phase::Transitioning,
            _ => Phase::Idle,
        };
        let subtree = &self.current.subtree;
        Snapshot {
            phase,
            loading: self.flight.is_some(),
            current: subtree.current().clone(),
            parent: subtree.parent().clone(),
            children: subtree.children().clone(),
            has_next_page: *subtree.has_next_page(),
            search: self.fetcher.search().clone(),
            generation: self.generation.latest(),
            cached: self.fetcher.cache().keys(),
        }
    }

    fn release_waiters(&mut self) {
        if self.flight.is_some() || self.waiters.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }

    #[tracing::instrument(skip_all)]
    fn teardown(mut self) {
        if let Some(Flight { errand, reply, .. }) = self.flight.take() {
            if let Errand::Drill { incoming, .. } = errand {
                incoming.destroy();
            }
            respond(reply, Err(Snag::Closed));
        }
        self.current.view.destroy();
        self.fetcher.destroy();
        tracing::info!("Navigator shut down.");
        if let Some(farewell) = self.farewell {
            let _ = farewell.send(());
        }
    }
}

/// Sends `result` to whoever asked, if anybody did.
fn respond(reply: Option<Reply>, result: Trek<()>) {
    match reply {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => {
            if let Err(snag) = result {
                tracing::debug!("Unanswered command failed: {snag}");
            }
        }
    }
}

fn render_options(
    dictionary: &Dictionary,
    search: &Option<String>,
    subtree: &Subtree,
) -> RenderOptions {
    let empty = subtree.children().is_empty();
    let empty_label = empty.then(|| dictionary.translate(i18n::NO_DATA));
    RenderOptions::new(empty_label, !empty || search.is_some())
}

fn header(dictionary: &Dictionary, subtree: &Subtree) -> Header {
    let current = subtree.current();
    let title = match current.name() {
        Some(name) => name.clone(),
        None if current.is_root() => dictionary.translate(i18n::ROOT_TITLE),
        None => current.id().to_string(),
    };
    Header::new(title, !current.is_root())
}

/// Talks to a spawned [`Navigator`].  Clone it freely; the navigator stops once every handle is
/// gone or [`Handle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct Handle {
    tx: mpsc::Sender<Order>,
    signals: broadcast::Sender<Signal>,
}

impl Handle {
    /// Sends `command` and waits until the navigator has carried it out, or decided not to.
    #[tracing::instrument(skip_all, fields(command = %command))]
    pub async fn submit(&self, command: Command) -> Trek<()> {
        let (reply, rx) = oneshot::channel();
        self.order(Order::Command {
            command,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| Snag::Closed)?
    }

    /// Sends `command` without waiting for the outcome.
    pub async fn send(&self, command: Command) -> Trek<()> {
        self.order(Order::Command {
            command,
            reply: None,
        })
        .await
    }

    /// The state of the navigator once it gets to this request.
    pub async fn snapshot(&self) -> Trek<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.order(Order::Snapshot(tx)).await?;
        rx.await.map_err(|_| Snag::Closed)
    }

    /// The state of the navigator once nothing is in flight.
    pub async fn settle(&self) -> Trek<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.order(Order::Settle(tx)).await?;
        rx.await.map_err(|_| Snag::Closed)
    }

    /// Subscribes to the [`Signal`] stream from here on.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Stops the navigator, destroying its columns and its cache.
    pub async fn shutdown(&self) -> Trek<()> {
        let (tx, rx) = oneshot::channel();
        self.order(Order::Shutdown(tx)).await?;
        rx.await.map_err(|_| Snag::Closed)
    }

    async fn order(&self, order: Order) -> Trek<()> {
        self.tx.send(order).await.map_err(|_| Snag::Closed)
    }
}
