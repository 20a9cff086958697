use crate::core::game_state::GameState;
use crate::core::player::PlayerId;
use crate::util::cancellation::CancellationToken;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};

const EXPLORATION_COEFFICIENT: f64 = std::f64::consts::SQRT_2;

/// Per-node statistics and tree links, guarded by one mutex per node so the
/// parallel builder only ever locks the single node it is mutating.
struct NodeBody<TGameState> {
    num_runs: u32,
    num_wins: f64,
    children: Vec<Arc<Node<TGameState>>>,
    untried_next_states: Vec<TGameState>,
}

pub struct Node<TGameState> {
    parent: Weak<Node<TGameState>>,
    /// Mover of the parent state, i.e. the player whose choice this node
    /// represents. Absent for a root.
    deciding_player: Option<PlayerId>,
    state: TGameState,
    heuristic_score_for_prev_player: f64,
    body: Mutex<NodeBody<TGameState>>,
}

impl<TGameState> Node<TGameState> {
    pub fn state(&self) -> &TGameState {
        &self.state
    }

    pub fn num_runs(&self) -> u32 {
        self.body.lock().unwrap().num_runs
    }

    pub fn num_wins(&self) -> f64 {
        self.body.lock().unwrap().num_wins
    }

    pub fn exploitation_value(&self) -> f64 {
        let body = self.body.lock().unwrap();
        body.num_wins / body.num_runs as f64
    }
}

impl<TGameState: fmt::Display> fmt::Display for Node<TGameState> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body.lock().unwrap();
        write!(
            f,
            "{} {:.1}/{}, HS={:.3}",
            self.state, body.num_wins, body.num_runs, self.heuristic_score_for_prev_player
        )
    }
}

/// Monte Carlo tree search over any [`GameState`]. One tree persists across
/// real moves through [`Mcts::reroot`], so earlier work keeps paying off.
pub struct Mcts<TTurn, TGameState> {
    root: Arc<Node<TGameState>>,
    _phantom: PhantomData<TTurn>,
}

impl<TTurn, TGameState> Mcts<TTurn, TGameState>
where
    TGameState: GameState<TTurn>,
{
    pub fn new(game_state: TGameState) -> Self {
        Self {
            root: Self::make_node(None, game_state),
            _phantom: PhantomData,
        }
    }

    pub fn root_state(&self) -> &TGameState {
        &self.root.state
    }

    pub fn num_runs(&self) -> u32 {
        let body = self.root.body.lock().unwrap();
        body.children.iter().map(|child| child.num_runs()).sum()
    }

    fn make_node(
        parent: Option<&Arc<Node<TGameState>>>,
        game_state: TGameState,
    ) -> Arc<Node<TGameState>> {
        let deciding_player = parent.map(|p| p.state.current_player_id());
        let heuristic_score_for_prev_player =
            game_state.heuristic_score(deciding_player.unwrap_or(PlayerId(0)));

        // successors sorted ascending by the mover's heuristic, so the most
        // promising is popped first; an immediate win eclipses the rest
        let mut untried_next_states = game_state.next_states(true);
        if let Some(winning_idx) = untried_next_states
            .iter()
            .position(|state| state.winner() == Some(game_state.current_player_id()))
        {
            let winning_state = untried_next_states.swap_remove(winning_idx);
            untried_next_states = vec![winning_state];
        }

        Arc::new(Node {
            parent: parent.map(Arc::downgrade).unwrap_or_default(),
            deciding_player,
            state: game_state,
            heuristic_score_for_prev_player,
            body: Mutex::new(NodeBody {
                num_runs: 0,
                num_wins: 0.0,
                children: Vec::new(),
                untried_next_states,
            }),
        })
    }

    /// UCT with a heuristic bias that fades as visits accumulate. An
    /// unvisited child is taken unconditionally.
    fn selection_preference(node: &Node<TGameState>, parent_num_runs: u32) -> f64 {
        let (num_runs, num_wins) = {
            let body = node.body.lock().unwrap();
            (body.num_runs, body.num_wins)
        };

        if num_runs == 0 {
            return f64::INFINITY;
        }

        let exploitation = num_wins / num_runs as f64;
        let exploration = EXPLORATION_COEFFICIENT
            * ((parent_num_runs.max(1) as f64).ln() / num_runs as f64).sqrt();
        let heuristic_bias =
            node.heuristic_score_for_prev_player.atan() / (num_runs as f64).sqrt();

        exploitation + exploration + heuristic_bias
    }

    fn select(&self) -> Arc<Node<TGameState>> {
        let mut node = Arc::clone(&self.root);

        loop {
            let (has_untried, parent_num_runs, children) = {
                let body = node.body.lock().unwrap();
                (
                    !body.untried_next_states.is_empty(),
                    body.num_runs,
                    body.children.clone(),
                )
            };

            if has_untried || node.state.has_winner() {
                return node;
            }

            let best_child = children.into_iter().max_by(|a, b| {
                Self::selection_preference(a, parent_num_runs)
                    .total_cmp(&Self::selection_preference(b, parent_num_runs))
            });

            match best_child {
                Some(child) => node = child,
                None => return node,
            }
        }
    }

    fn expand(node: &Arc<Node<TGameState>>) -> Arc<Node<TGameState>> {
        let state_to_try = node.body.lock().unwrap().untried_next_states.pop();

        match state_to_try {
            None => Arc::clone(node),
            Some(state) => {
                // node construction enumerates successors; keep it outside
                // the parent's lock
                let child = Self::make_node(Some(node), state);
                node.body.lock().unwrap().children.push(Arc::clone(&child));
                child
            }
        }
    }

    fn simulate_to_end<R: Rng>(mut game_state: TGameState, rng: &mut R) -> TGameState {
        while !game_state.has_winner() {
            match game_state.weighted_random_next_state(rng) {
                Some(next) => game_state = next,
                None => break,
            }
        }

        game_state
    }

    fn back_propagate(node: Arc<Node<TGameState>>, terminal_winner: Option<PlayerId>) {
        let mut current = Some(node);

        while let Some(n) = current {
            {
                let mut body = n.body.lock().unwrap();
                body.num_runs += 1;

                if terminal_winner.is_some() && terminal_winner == n.deciding_player {
                    body.num_wins += 1.0;
                }
            }

            current = n.parent.upgrade();
        }
    }

    fn build_tree_piece(&self, token: &impl CancellationToken, rng: &mut SmallRng) {
        while !token.is_cancellation_requested() {
            let node = self.select();
            let node = Self::expand(&node);
            let terminal_state = Self::simulate_to_end(node.state.clone(), rng);
            Self::back_propagate(node, terminal_state.winner());
        }
    }

    /// Runs select/expand/simulate/backpropagate until the token trips.
    pub fn build_tree(&self, token: &impl CancellationToken, rng: &mut SmallRng) {
        self.build_tree_piece(token, rng);
    }

    /// The same loop from several workers over the shared tree. Counters
    /// read during selection may lag a concurrent backpropagation; that
    /// staleness only perturbs exploration order.
    pub fn build_tree_parallel(
        &self,
        token: &(impl CancellationToken + Sync),
        num_threads: usize,
        seed: u64,
    ) where
        TGameState: Send + Sync,
        TTurn: Send + Sync,
    {
        std::thread::scope(|scope| {
            for worker_idx in 0..num_threads.max(1) {
                let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(worker_idx as u64));
                let mcts = &*self;
                scope.spawn(move || {
                    mcts.build_tree_piece(token, &mut rng);
                });
            }
        });
    }

    /// Root children ranked best-first: most-visited, then highest win
    /// rate.
    pub fn top_turns(&self) -> Vec<Arc<Node<TGameState>>> {
        let mut children = self.root.body.lock().unwrap().children.clone();

        children.sort_by(|a, b| {
            b.num_runs()
                .cmp(&a.num_runs())
                .then_with(|| b.exploitation_value().total_cmp(&a.exploitation_value()))
        });

        children
    }

    /// Visit-count bookkeeping check: every internal node's run count must
    /// equal its children's total, give or take the node's own in-flight
    /// visit. Mismatches are logged.
    pub fn is_tree_valid(&self) -> bool {
        Self::is_subtree_valid(&self.root, &mut Vec::new())
    }

    fn is_subtree_valid(node: &Arc<Node<TGameState>>, children_idxs: &mut Vec<usize>) -> bool {
        let mut is_valid = true;

        let (num_runs, children) = {
            let body = node.body.lock().unwrap();
            (body.num_runs, body.children.clone())
        };

        let children_run_sum: u32 = children.iter().map(|child| child.num_runs()).sum();

        if !node.state.has_winner()
            && children_run_sum != num_runs
            && children_run_sum + 1 != num_runs
        {
            log::warn!(
                "node({}) has run-count mismatch: {} children runs vs {} own",
                children_idxs.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(","),
                children_run_sum,
                num_runs,
            );
            is_valid = false;
        }

        for (i, child) in children.iter().enumerate() {
            children_idxs.push(i);
            if !Self::is_subtree_valid(child, children_idxs) {
                is_valid = false;
            }
            children_idxs.pop();
        }

        is_valid
    }

    /// Follows the goal state's real-move history down the tree, reusing
    /// the matching subtree when every step is found; otherwise starts
    /// over from a fresh root. Returns whether the tree was reused.
    pub fn reroot(&mut self, goal_state: &TGameState) -> bool {
        let mut state_hist: Vec<&TGameState> = Vec::new();
        let mut state = Some(goal_state);

        while let Some(s) = state {
            state_hist.push(s);
            state = s.prev_state();
        }

        state_hist.reverse();

        for fwd_state in state_hist {
            let matching_child = self
                .root
                .body
                .lock()
                .unwrap()
                .children
                .iter()
                .find(|child| child.state == *fwd_state)
                .cloned();

            if let Some(child) = matching_child {
                self.root = child;
            }
        }

        if self.root.state == *goal_state {
            return true;
        }

        self.root = Self::make_node(None, goal_state.clone());
        false
    }
}
